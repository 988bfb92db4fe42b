use std::collections::{HashMap, HashSet, VecDeque};

use chrono::Duration;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use coursebin_logging::{cb_debug, cb_info};

use crate::course::{CourseData, CourseDataError, Timestamp};
use crate::node::{Node, NodeId, NodeKind};
use crate::staleness::{is_stale, CourseKey};
use crate::transform::transform_course;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum CoursebinError {
    #[error("invalid course data: {0}")]
    InvalidCourseData(#[from] CourseDataError),
    #[error("node {0} appears more than once")]
    DuplicateNode(NodeId),
    #[error("node {node} references missing parent {parent}")]
    DanglingParent { node: NodeId, parent: NodeId },
    #[error("course {0} has more than one root")]
    DuplicateRoot(String),
    #[error("saved coursebin is malformed: {0}")]
    Malformed(String),
}

/// Outcome of merging one fetched course into the bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeSummary {
    /// Nodes that matched an existing node id and kept its user flags.
    pub kept: usize,
    /// Nodes without a previous counterpart.
    pub inserted: usize,
    /// Previous nodes no longer present in the fetched course.
    pub dropped: usize,
}

/// The flat node collection of every course in the bin.
///
/// Nodes live in a `Vec` in collection order; `index` maps ids to positions
/// and `children` maps a parent id to the positions of its children. Both
/// indices are rebuilt after every structural change, and every mutation
/// goes through the methods below.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<Node>", into = "Vec<Node>")]
pub struct Coursebin {
    nodes: Vec<Node>,
    index: HashMap<NodeId, usize>,
    children: HashMap<NodeId, Vec<usize>>,
}

impl PartialEq for Coursebin {
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes
    }
}

impl TryFrom<Vec<Node>> for Coursebin {
    type Error = CoursebinError;

    fn try_from(nodes: Vec<Node>) -> Result<Self, Self::Error> {
        Self::from_nodes(nodes)
    }
}

impl From<Coursebin> for Vec<Node> {
    fn from(bin: Coursebin) -> Self {
        bin.nodes
    }
}

impl Coursebin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a bin from nodes in collection order, checking that ids are
    /// unique, every parent exists and no course has two roots.
    pub fn from_nodes(nodes: Vec<Node>) -> Result<Self, CoursebinError> {
        let mut ids = HashSet::with_capacity(nodes.len());
        let mut roots = HashSet::new();
        for node in &nodes {
            if !ids.insert(&node.node_id) {
                return Err(CoursebinError::DuplicateNode(node.node_id.clone()));
            }
            if node.is_course_root() && !roots.insert(node.course.as_str()) {
                return Err(CoursebinError::DuplicateRoot(node.course.clone()));
            }
        }
        for node in &nodes {
            if let Some(parent) = &node.parent {
                if !ids.contains(parent) {
                    return Err(CoursebinError::DanglingParent {
                        node: node.node_id.clone(),
                        parent: parent.clone(),
                    });
                }
            }
        }

        let mut bin = Self {
            nodes,
            ..Self::default()
        };
        bin.reindex();
        Ok(bin)
    }

    /// Load a saved-profile blob: a JSON array of nodes.
    pub fn load_saved(value: Value) -> Result<Self, CoursebinError> {
        let nodes: Vec<Node> = serde_json::from_value(value)
            .map_err(|err| CoursebinError::Malformed(err.to_string()))?;
        Self::from_nodes(nodes)
    }

    /// The collection as the JSON array sent with jobs and saved profiles.
    pub fn to_saved(&self) -> Result<Value, CoursebinError> {
        serde_json::to_value(&self.nodes).map_err(|err| CoursebinError::Malformed(err.to_string()))
    }

    fn reindex(&mut self) {
        self.index.clear();
        self.children.clear();
        for (position, node) in self.nodes.iter().enumerate() {
            self.index.insert(node.node_id.clone(), position);
            if let Some(parent) = &node.parent {
                self.children
                    .entry(parent.clone())
                    .or_default()
                    .push(position);
            }
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, node_id: &str) -> Option<&Node> {
        self.index.get(node_id).map(|&position| &self.nodes[position])
    }

    pub fn contains_course(&self, course: &str) -> bool {
        self.nodes
            .iter()
            .any(|node| node.is_course_root() && node.course == course)
    }

    pub fn children<'a>(&'a self, node_id: &str) -> impl Iterator<Item = &'a Node> + 'a {
        self.children
            .get(node_id)
            .into_iter()
            .flatten()
            .map(move |&position| &self.nodes[position])
    }

    /// Every node below `node_id`, breadth first. The node itself is not
    /// included.
    pub fn descendants(&self, node_id: &str) -> Vec<&Node> {
        self.subtree_positions(node_id)
            .into_iter()
            .skip(1)
            .map(|position| &self.nodes[position])
            .collect()
    }

    /// Real course roots in collection order.
    pub fn course_roots(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|node| node.is_course_root())
    }

    pub fn max_group(&self) -> u32 {
        self.course_roots()
            .filter_map(|node| node.group)
            .max()
            .unwrap_or(0)
    }

    /// Positions of `node_id` and all its descendants in BFS order.
    fn subtree_positions(&self, node_id: &str) -> Vec<usize> {
        let Some(&start) = self.index.get(node_id) else {
            return Vec::new();
        };
        let mut visited = vec![false; self.nodes.len()];
        let mut order = Vec::new();
        let mut queue = VecDeque::from([start]);
        while let Some(position) = queue.pop_front() {
            if std::mem::replace(&mut visited[position], true) {
                continue;
            }
            order.push(position);
            if let Some(kids) = self.children.get(&self.nodes[position].node_id) {
                queue.extend(kids.iter().copied());
            }
        }
        order
    }

    /// Transform `data` and reconcile it with the nodes already held for the
    /// same course.
    ///
    /// Matching node ids keep `exclude`, `exempt` and `group` from the old
    /// node and take everything else from the new one. The merged subtree
    /// takes the place of the old one in collection order; a course seen for
    /// the first time is appended and gets the next free group.
    pub fn merge_course(&mut self, data: &CourseData) -> Result<MergeSummary, CoursebinError> {
        let mut incoming = transform_course(data)?;
        let course = data.name.as_str();

        let mut summary = MergeSummary::default();
        {
            let previous: HashMap<&NodeId, &Node> = self
                .nodes
                .iter()
                .filter(|node| node.course == course && !node.loading)
                .map(|node| (&node.node_id, node))
                .collect();

            for node in &mut incoming {
                match previous.get(&node.node_id) {
                    Some(old) => {
                        node.inherit_user_flags(old);
                        summary.kept += 1;
                    }
                    None => summary.inserted += 1,
                }
            }
            summary.dropped = previous.len() - summary.kept;
        }

        let next_group = self.max_group() + 1;
        if let Some(root) = incoming.first_mut() {
            if root.group.is_none() {
                root.group = Some(next_group);
            }
        }

        let mut insert_at = None;
        let mut remaining = Vec::with_capacity(self.nodes.len() + incoming.len());
        for node in std::mem::take(&mut self.nodes) {
            if node.course == course {
                insert_at.get_or_insert(remaining.len());
            } else {
                remaining.push(node);
            }
        }
        let at = insert_at.unwrap_or(remaining.len());
        remaining.splice(at..at, incoming);
        self.nodes = remaining;
        self.reindex();

        cb_info!(
            "Merged course {} ({}): kept={} inserted={} dropped={}",
            course,
            data.term,
            summary.kept,
            summary.inserted,
            summary.dropped
        );
        Ok(summary)
    }

    /// Remove every node of `course` except loading placeholders, which
    /// belong to a fetch still in flight. Returns the number removed.
    pub fn delete_course(&mut self, course: &str) -> usize {
        let before = self.nodes.len();
        self.nodes.retain(|node| node.course != course || node.loading);
        let removed = before - self.nodes.len();
        if removed > 0 {
            self.reindex();
        }
        cb_debug!("Deleted course {}: {} nodes removed", course, removed);
        removed
    }

    /// Insert the loading placeholder for `course`. No-op if present.
    pub fn add_loading(&mut self, course: &str) -> bool {
        let placeholder = Node::loading_placeholder(course);
        if self.index.contains_key(&placeholder.node_id) {
            return false;
        }
        self.nodes.push(placeholder);
        self.reindex();
        true
    }

    pub fn remove_loading(&mut self, course: &str) -> bool {
        let id = NodeId::loading(course);
        let before = self.nodes.len();
        self.nodes.retain(|node| node.node_id != id);
        if self.nodes.len() == before {
            return false;
        }
        self.reindex();
        true
    }

    fn node_mut(&mut self, node_id: &str) -> Option<&mut Node> {
        let position = *self.index.get(node_id)?;
        self.nodes.get_mut(position)
    }

    /// Flip `exclude` on exactly this node. Unknown ids are ignored.
    pub fn toggle_exclude(&mut self, node_id: &str) -> bool {
        match self.node_mut(node_id) {
            Some(node) => {
                node.exclude = !node.exclude;
                true
            }
            None => false,
        }
    }

    /// Flip `exempt` on exactly this node. Unknown ids are ignored.
    pub fn toggle_exempt(&mut self, node_id: &str) -> bool {
        match self.node_mut(node_id) {
            Some(node) => {
                node.exempt = !node.exempt;
                true
            }
            None => false,
        }
    }

    /// Set `exempt` on the node and its whole subtree. Returns how many
    /// nodes were written.
    pub fn recursive_set_exempt(&mut self, node_id: &str, value: bool) -> usize {
        let positions = self.subtree_positions(node_id);
        for &position in &positions {
            self.nodes[position].exempt = value;
        }
        positions.len()
    }

    /// Reassign the group of a course root. Groups are positive, so zero is
    /// rejected like an unknown id.
    pub fn set_group(&mut self, node_id: &str, group: u32) -> bool {
        if group == 0 {
            return false;
        }
        match self.node_mut(node_id) {
            Some(node) if node.is_course_root() => {
                node.group = Some(group);
                true
            }
            _ => false,
        }
    }

    /// Renumber groups densely from 1, keeping their relative order.
    pub fn start_group_from_one(&mut self) {
        let mut groups: Vec<u32> = self.course_roots().filter_map(|node| node.group).collect();
        groups.sort_unstable();
        groups.dedup();
        let mapping: HashMap<u32, u32> = groups
            .into_iter()
            .zip(1..)
            .collect();

        for node in self.nodes.iter_mut().filter(|node| node.is_course_root()) {
            if let Some(group) = node.group {
                node.group = mapping.get(&group).copied();
            }
        }
    }

    /// Give the i-th course root group `i`, ignoring previous values.
    pub fn reset_groups(&mut self) {
        for (node, group) in self
            .nodes
            .iter_mut()
            .filter(|node| node.is_course_root())
            .zip(1..)
        {
            node.group = Some(group);
        }
    }

    /// Include or exclude every section. Other node kinds are untouched.
    pub fn set_include_all(&mut self, included: bool) -> usize {
        let mut touched = 0;
        for node in self.nodes.iter_mut().filter(|node| node.is_section()) {
            node.exclude = !included;
            touched += 1;
        }
        touched
    }

    /// Courses whose data is older than `lifetime`, or carries no timestamp.
    pub fn stale_courses(&self, now: Timestamp, lifetime: Duration) -> Vec<CourseKey> {
        self.course_roots()
            .filter(|node| is_stale(node.updated, now, lifetime))
            .filter_map(|node| {
                node.term
                    .as_ref()
                    .map(|term| CourseKey::new(node.course.clone(), term.clone()))
            })
            .collect()
    }

    /// Sections that are not excluded, over all sections below `node_id`.
    pub fn section_counts(&self, node_id: &str) -> (usize, usize) {
        let sections = self.descendants(node_id);
        let sections = sections.iter().filter(|node| node.kind == NodeKind::Section);
        sections.fold((0, 0), |(active, total), node| {
            (active + usize::from(!node.exclude), total + 1)
        })
    }
}
