use std::collections::HashSet;

use crate::course::{CourseData, CourseDataError};
use crate::node::Node;

/// Where the walk currently attaches sections.
struct Cursor<'a> {
    part: Node,
    component: Node,
    section_type: &'a str,
}

/// Flatten one course into `course → part → component → section` nodes.
///
/// Sections are walked in input order. A run of equal section types shares
/// one component; a section type reappearing after a different one closes
/// the current part and opens the next, so repeating cycles such as
/// `Lecture, Lab, Lecture, Lab` become one part per cycle.
pub fn transform_course(data: &CourseData) -> Result<Vec<Node>, CourseDataError> {
    data.validate()?;

    let root = Node::course_root(&data.name, &data.term, data.updated);
    let mut nodes = vec![root.clone()];
    let mut seen_ids = HashSet::new();
    let mut seen_types: HashSet<&str> = HashSet::new();
    let mut part_count = 0u32;
    let mut cursor: Option<Cursor<'_>> = None;

    for section in &data.sections {
        let section_type = section.section_type.as_str();

        let current = match cursor.take() {
            Some(current) if current.section_type == section_type => current,
            previous => {
                let part = match previous {
                    Some(previous) if !seen_types.contains(section_type) => previous.part,
                    _ => {
                        let part = Node::part(&root, part_count);
                        part_count += 1;
                        seen_types.clear();
                        nodes.push(part.clone());
                        part
                    }
                };
                let component = Node::component(&part, section_type);
                seen_types.insert(section_type);
                nodes.push(component.clone());
                Cursor {
                    part,
                    component,
                    section_type,
                }
            }
        };

        let node = Node::section(&current.component, section);
        if !seen_ids.insert(node.node_id.clone()) {
            return Err(CourseDataError::DuplicateSection {
                course: data.name.clone(),
                section_id: section.section_id.clone(),
            });
        }
        nodes.push(node);
        cursor = Some(current);
    }

    Ok(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::course::SectionData;
    use crate::node::NodeKind;

    fn course(types: &[&str]) -> CourseData {
        CourseData {
            name: "csci-201".to_string(),
            term: "20201".to_string(),
            updated: None,
            sections: types
                .iter()
                .enumerate()
                .map(|(i, t)| SectionData::new(format!("{}", 100 + i), *t))
                .collect(),
        }
    }

    fn ids(nodes: &[Node]) -> Vec<&str> {
        nodes.iter().map(|n| n.node_id.as_str()).collect()
    }

    #[test]
    fn no_sections_yields_root_only() {
        let nodes = transform_course(&course(&[])).unwrap();
        assert_eq!(ids(&nodes), vec!["csci-201"]);
        assert_eq!(nodes[0].kind, NodeKind::Course);
    }

    #[test]
    fn single_section_yields_four_nodes() {
        let nodes = transform_course(&course(&["Lecture"])).unwrap();
        assert_eq!(
            ids(&nodes),
            vec![
                "csci-201",
                "csci-201.0",
                "csci-201.0.Lecture",
                "csci-201.0.Lecture.100"
            ]
        );
    }

    #[test]
    fn repeating_cycle_opens_new_parts() {
        let nodes = transform_course(&course(&["Lecture", "Lab", "Lecture", "Lab"])).unwrap();
        assert_eq!(
            ids(&nodes),
            vec![
                "csci-201",
                "csci-201.0",
                "csci-201.0.Lecture",
                "csci-201.0.Lecture.100",
                "csci-201.0.Lab",
                "csci-201.0.Lab.101",
                "csci-201.1",
                "csci-201.1.Lecture",
                "csci-201.1.Lecture.102",
                "csci-201.1.Lab",
                "csci-201.1.Lab.103",
            ]
        );
    }

    #[test]
    fn runs_of_one_type_share_a_component() {
        let nodes = transform_course(&course(&["Lecture", "Lecture", "Lab", "Lab", "Lab"])).unwrap();
        let parts = nodes.iter().filter(|n| n.kind == NodeKind::Part).count();
        let components = nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Component)
            .count();
        assert_eq!(parts, 1);
        assert_eq!(components, 2);
        assert_eq!(nodes.len(), 1 + 1 + 2 + 5);
    }

    #[test]
    fn duplicate_section_is_invalid() {
        let mut data = course(&["Lecture", "Lecture"]);
        data.sections[1].section_id = data.sections[0].section_id.clone();
        let err = transform_course(&data).unwrap_err();
        assert!(matches!(err, CourseDataError::DuplicateSection { .. }));
    }

    #[test]
    fn empty_name_is_invalid() {
        let mut data = course(&["Lecture"]);
        data.name = "  ".to_string();
        assert_eq!(
            transform_course(&data).unwrap_err(),
            CourseDataError::MissingField("name")
        );
    }
}
