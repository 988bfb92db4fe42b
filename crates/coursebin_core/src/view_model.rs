use crate::{JobId, JobStatus, NodeId, Notice, SectionData, Timestamp};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppViewModel {
    /// Courses ordered by group, then id.
    pub courses: Vec<CourseRow>,
    pub loading: Vec<String>,
    pub job: Option<JobView>,
    pub notices: Vec<Notice>,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CourseRow {
    pub node_id: NodeId,
    pub course: String,
    pub term: Option<String>,
    pub group: Option<u32>,
    pub loading: bool,
    pub exclude: bool,
    pub exempt: bool,
    pub updated: Option<Timestamp>,
    pub active_sections: usize,
    pub total_sections: usize,
    pub components: Vec<ComponentRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComponentRow {
    pub node_id: NodeId,
    pub part: u32,
    pub name: String,
    pub active: usize,
    pub sections: Vec<SectionRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SectionRow {
    pub node_id: NodeId,
    pub section_id: String,
    pub exclude: bool,
    pub exempt: bool,
    pub data: Option<SectionData>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobView {
    pub id: JobId,
    pub name: String,
    pub status: JobStatus,
    pub message: Option<String>,
    pub schedule_count: Option<u64>,
    pub tracking: bool,
    pub timed_out: bool,
}
