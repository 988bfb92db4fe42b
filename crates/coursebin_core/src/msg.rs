use crate::{CourseData, JobRecord, NodeId, ProfileKind, ReservedSlot, SavedProfile};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// User asked to add (or refetch) a course.
    AddCourseRequested { term: String, course: String },
    /// Background refresh of bin courses older than the section lifetime.
    RefreshStaleCourses {
        now: crate::Timestamp,
        lifetime: chrono::Duration,
    },
    /// A course fetch finished. The error is already rendered for display.
    CourseFetched {
        course: String,
        result: Result<CourseData, String>,
    },
    DeleteCourse(String),
    ToggleExclude(NodeId),
    ToggleExempt(NodeId),
    SetExemptRecursive { node_id: NodeId, value: bool },
    SetGroup { node_id: NodeId, group: u32 },
    StartGroupFromOne,
    ResetGroups,
    SetIncludeAll(bool),
    PreferenceEdited { key: String, value: String },
    ReservedSlotAdded(ReservedSlot),
    ReservedSlotsRemoved(Vec<String>),
    /// User submitted the bin for schedule generation.
    SubmitClicked { name: Option<String> },
    /// User asked to follow an existing job.
    TrackJobRequested(crate::JobId),
    /// Latest observed state of the tracked job.
    JobUpdated(JobRecord),
    /// The attempt budget ran out while the job was still pending.
    JobPollTimedOut { job_id: crate::JobId, attempts: u32 },
    JobRequestFailed(String),
    ProfileLoadRequested { kind: ProfileKind, id: u64 },
    ProfileSaveRequested { kind: ProfileKind, id: u64 },
    ProfileLoaded(Result<SavedProfile, String>),
    ProfileSaved(Result<u64, String>),
    /// The consuming view is going away.
    ViewClosed,
}
