//! Coursebin core: node model, merge logic and the pure state machine that
//! drives them.
mod course;
mod coursebin;
mod effect;
mod job;
mod msg;
mod node;
mod preferences;
mod profile;
mod staleness;
mod state;
mod transform;
mod update;
mod view_model;

pub use course::{CourseData, CourseDataError, SectionData, Timestamp};
pub use coursebin::{Coursebin, CoursebinError, MergeSummary};
pub use effect::Effect;
pub use job::{JobId, JobRecord, JobStatus, PollSchedule, TaskRequest, TimeoutPolicy};
pub use msg::Msg;
pub use node::{Node, NodeId, NodeKind};
pub use preferences::{PreferenceError, Preferences, ReservedSlot};
pub use profile::{ProfileKind, SavedProfile};
pub use staleness::{
    default_lifetime, is_stale, merge_refreshed_sections, partition_stale, stale_course_keys,
    CourseKey, ScheduledSection,
};
pub use state::{AppState, Notice, NoticeLevel, StateSnapshot};
pub use transform::transform_course;
pub use update::update;
pub use view_model::{AppViewModel, ComponentRow, CourseRow, JobView, SectionRow};
