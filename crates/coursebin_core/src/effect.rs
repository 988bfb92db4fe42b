use crate::{JobId, ProfileKind, SavedProfile, TaskRequest};

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    FetchCourse { term: String, course: String },
    SubmitJob(TaskRequest),
    TrackJob { job_id: JobId },
    LoadProfile { kind: ProfileKind, id: u64 },
    SaveProfile {
        kind: ProfileKind,
        id: u64,
        profile: SavedProfile,
    },
    /// Abort every request issued on behalf of the current view.
    CancelPending,
}
