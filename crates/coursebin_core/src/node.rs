use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::course::{SectionData, Timestamp};

const LOADING_SUFFIX: &str = "loading";

/// Keys a node writes itself. Section payload fields with these names are
/// dropped so the flattened node never carries a key twice.
const NODE_KEYS: &[&str] = &[
    "node_id", "key", "parent", "type", "course", "term", "part", "component", "group",
    "exclude", "exempt", "loading", "updated",
];

/// Primary key of a node: the ancestor path joined with `.`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Id of the in-flight placeholder for `course`.
    pub fn loading(course: &str) -> Self {
        Self(format!("{course}.{LOADING_SUFFIX}"))
    }

    pub fn child(&self, segment: impl fmt::Display) -> Self {
        Self(format!("{}.{}", self.0, segment))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Course,
    Part,
    Component,
    Section,
}

/// One entry of the flattened course/part/component/section tree.
///
/// Section nodes carry their scheduling payload at the top level of the
/// node object, next to the tree fields, which is the shape jobs and saved
/// profiles exchange with the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub node_id: NodeId,
    /// Display key; equal to `node_id` for every node the client builds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<NodeId>,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub course: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<u32>,
    #[serde(default)]
    pub exclude: bool,
    #[serde(default)]
    pub exempt: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub loading: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<Timestamp>,
    #[serde(flatten)]
    pub section: Option<SectionData>,
}

impl Node {
    fn bare(node_id: NodeId, kind: NodeKind, course: &str) -> Self {
        Self {
            key: Some(node_id.to_string()),
            node_id,
            parent: None,
            kind,
            course: course.to_string(),
            term: None,
            part: None,
            component: None,
            group: None,
            exclude: false,
            exempt: false,
            loading: false,
            updated: None,
            section: None,
        }
    }

    pub fn course_root(course: &str, term: &str, updated: Option<Timestamp>) -> Self {
        Self {
            term: Some(term.to_string()),
            updated,
            ..Self::bare(NodeId::new(course), NodeKind::Course, course)
        }
    }

    /// Placeholder root shown while the first fetch of `course` is in flight.
    pub fn loading_placeholder(course: &str) -> Self {
        Self {
            loading: true,
            ..Self::bare(NodeId::loading(course), NodeKind::Course, course)
        }
    }

    pub fn part(root: &Node, part: u32) -> Self {
        Self {
            parent: Some(root.node_id.clone()),
            term: root.term.clone(),
            part: Some(part),
            updated: root.updated,
            ..Self::bare(root.node_id.child(part), NodeKind::Part, &root.course)
        }
    }

    pub fn component(part: &Node, section_type: &str) -> Self {
        Self {
            parent: Some(part.node_id.clone()),
            term: part.term.clone(),
            part: part.part,
            component: Some(section_type.to_string()),
            updated: part.updated,
            ..Self::bare(
                part.node_id.child(section_type),
                NodeKind::Component,
                &part.course,
            )
        }
    }

    pub fn section(component: &Node, data: &SectionData) -> Self {
        let mut data = data.clone();
        data.extra.retain(|key, _| !NODE_KEYS.contains(&key.as_str()));
        let node_id = component.node_id.child(&data.section_id);
        Self {
            parent: Some(component.node_id.clone()),
            term: component.term.clone(),
            part: component.part,
            component: component.component.clone(),
            updated: component.updated,
            section: Some(data),
            ..Self::bare(
                node_id,
                NodeKind::Section,
                &component.course,
            )
        }
    }

    /// A real (non-placeholder) course root.
    pub fn is_course_root(&self) -> bool {
        self.kind == NodeKind::Course && !self.loading
    }

    pub fn is_section(&self) -> bool {
        self.kind == NodeKind::Section
    }

    /// Carries the user-owned flags of `previous` over to a freshly
    /// transformed node. Content fields are left as they are.
    pub(crate) fn inherit_user_flags(&mut self, previous: &Node) {
        self.exclude = previous.exclude;
        self.exempt = previous.exempt;
        if previous.group.is_some() {
            self.group = previous.group;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_dotted_ancestor_paths() {
        let root = Node::course_root("csci-201", "20201", None);
        let part = Node::part(&root, 0);
        let component = Node::component(&part, "Lecture");
        let section = Node::section(&component, &SectionData::new("12345", "Lecture"));

        assert_eq!(section.node_id.as_str(), "csci-201.0.Lecture.12345");
        assert_eq!(section.parent.as_ref(), Some(&component.node_id));
        assert_eq!(section.part, Some(0));
        assert_eq!(section.component.as_deref(), Some("Lecture"));
        assert_eq!(section.term.as_deref(), Some("20201"));
    }

    #[test]
    fn placeholder_is_not_a_course_root() {
        let placeholder = Node::loading_placeholder("math-225");
        assert_eq!(placeholder.node_id.as_str(), "math-225.loading");
        assert!(!placeholder.is_course_root());
    }

    #[test]
    fn serialized_node_uses_type_key() {
        let root = Node::course_root("csci-201", "20201", None);
        let value = serde_json::to_value(&root).unwrap();
        assert_eq!(value["type"], "course");
        assert_eq!(value["node_id"], "csci-201");
        assert!(value.get("loading").is_none());
        assert_eq!(value["key"], "csci-201");
    }

    #[test]
    fn section_payload_sits_on_the_node() {
        let root = Node::course_root("csci-201", "20201", None);
        let component = Node::component(&Node::part(&root, 0), "Lecture");
        let mut data = SectionData::new("29911", "Lecture");
        data.days = Some("13".to_string());
        data.extra.insert("units".to_string(), serde_json::json!("4.0"));
        data.extra.insert("course".to_string(), serde_json::json!("other"));

        let value = serde_json::to_value(Node::section(&component, &data)).unwrap();

        assert_eq!(value["section_id"], "29911");
        assert_eq!(value["days"], "13");
        assert_eq!(value["units"], "4.0");
        assert_eq!(value["course"], "csci-201");
        assert_eq!(value["key"], "csci-201.0.Lecture.29911");
        assert!(value.get("section").is_none());
    }

    #[test]
    fn tree_nodes_have_no_section_payload() {
        let value = serde_json::json!({
            "node_id": "csci-201.0",
            "key": "csci-201.0",
            "parent": "csci-201",
            "type": "part",
            "course": "csci-201",
            "part": 0
        });
        let node: Node = serde_json::from_value(value).unwrap();
        assert_eq!(node.section, None);
        assert_eq!(node.part, Some(0));
    }
}
