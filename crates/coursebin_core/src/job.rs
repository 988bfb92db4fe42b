use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::course::Timestamp;
use crate::preferences::Preferences;

pub type JobId = u64;

/// Status of a schedule-generation job, as the two-letter wire code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    #[serde(rename = "PD")]
    Pending,
    #[serde(rename = "PS")]
    Processing,
    #[serde(rename = "DN")]
    Done,
    #[serde(rename = "WN")]
    Warning,
    #[serde(rename = "FL")]
    Failed,
    #[serde(rename = "EX")]
    Exception,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::Pending | JobStatus::Processing)
    }

    /// `Failed` and `Exception` carry a server diagnostic in the job message.
    pub fn is_failure(self) -> bool {
        matches!(self, JobStatus::Failed | JobStatus::Exception)
    }

    pub fn code(self) -> &'static str {
        match self {
            JobStatus::Pending => "PD",
            JobStatus::Processing => "PS",
            JobStatus::Done => "DN",
            JobStatus::Warning => "WN",
            JobStatus::Failed => "FL",
            JobStatus::Exception => "EX",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Done => "done",
            JobStatus::Warning => "warning",
            JobStatus::Failed => "failed",
            JobStatus::Exception => "exception",
        };
        f.write_str(label)
    }
}

/// A job as returned by `POST /tasks/` and `GET /tasks/{id}/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: JobId,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<Timestamp>,
    #[serde(default)]
    pub schedules: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl JobRecord {
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => format!("Task {}", self.id),
        }
    }
}

/// Body of `POST /tasks/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRequest {
    pub coursebin: Value,
    pub preference: Preferences,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// What to do once the attempt budget runs out while the job is still
/// pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutPolicy {
    /// Report the timeout and stop polling.
    #[default]
    GiveUp,
    /// Report the timeout and keep polling at the capped delay.
    KeepPolling,
}

/// Exponential backoff between polls of a non-terminal job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    pub base: Duration,
    pub max: Duration,
    /// Number of delayed re-polls allowed after the first poll.
    pub ttl: Option<u32>,
    pub on_timeout: TimeoutPolicy,
}

impl Default for PollSchedule {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(500),
            max: Duration::from_secs(60),
            ttl: Some(5),
            on_timeout: TimeoutPolicy::GiveUp,
        }
    }
}

impl PollSchedule {
    /// Delay before re-poll number `retry` (0-based): `base * 2^retry`,
    /// capped at `max`.
    pub fn delay(&self, retry: u32) -> Duration {
        let factor = 2u32.checked_pow(retry).unwrap_or(u32::MAX);
        self.base
            .checked_mul(factor)
            .map_or(self.max, |delay| delay.min(self.max))
    }

    /// True once `retries` re-polls have used up the budget.
    pub fn is_exhausted(&self, retries: u32) -> bool {
        self.ttl.is_some_and(|ttl| retries >= ttl)
    }
}
