//! Coursebin client: HTTP API, job polling and section refresh.
mod api;
mod poll;
mod refresh;
mod scope;
mod types;

pub use api::{ApiSettings, ReqwestApi, SchedulerApi};
pub use poll::{ChannelJobSink, JobClient, JobError, JobEvent, JobSink};
pub use refresh::{RefreshReport, SectionRefresher};
pub use scope::ViewScope;
pub use types::{ApiError, FailureKind};
