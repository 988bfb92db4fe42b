use std::sync::{mpsc, Arc};

use coursebin_core::{JobId, JobRecord, JobStatus, PollSchedule, TaskRequest, TimeoutPolicy};
use coursebin_logging::{cb_debug, cb_info, cb_warn};

use crate::{ApiError, SchedulerApi, ViewScope};

#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    /// Latest observed record, emitted after every successful poll.
    Updated(JobRecord),
    /// The attempt budget ran out while the job was still live. Emitted once.
    TimedOut { job_id: JobId, attempts: u32 },
}

pub trait JobSink: Send + Sync {
    fn emit(&self, event: JobEvent);
}

pub struct ChannelJobSink {
    tx: mpsc::Sender<JobEvent>,
}

impl ChannelJobSink {
    pub fn new(tx: mpsc::Sender<JobEvent>) -> Self {
        Self { tx }
    }
}

impl JobSink for ChannelJobSink {
    fn emit(&self, event: JobEvent) {
        let _ = self.tx.send(event);
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum JobError {
    #[error(transparent)]
    Api(ApiError),
    #[error("job {job_id} is still {status} after {attempts} polls")]
    PollTimeout {
        job_id: JobId,
        status: JobStatus,
        attempts: u32,
    },
    #[error("job {job_id} {status}: {message}")]
    TerminalFailure {
        job_id: JobId,
        status: JobStatus,
        message: String,
    },
    #[error("job tracking cancelled")]
    Cancelled,
}

impl From<ApiError> for JobError {
    fn from(err: ApiError) -> Self {
        if err.is_cancelled() {
            JobError::Cancelled
        } else {
            JobError::Api(err)
        }
    }
}

/// Submits jobs and follows them to a terminal status.
#[derive(Clone)]
pub struct JobClient {
    api: Arc<dyn SchedulerApi>,
    schedule: PollSchedule,
}

impl JobClient {
    pub fn new(api: Arc<dyn SchedulerApi>, schedule: PollSchedule) -> Self {
        Self { api, schedule }
    }

    pub async fn submit(
        &self,
        scope: &ViewScope,
        request: &TaskRequest,
    ) -> Result<JobRecord, JobError> {
        Ok(scope.run(self.api.submit_task(request)).await?)
    }

    /// One status request. Polling a terminal job returns the same record
    /// again.
    pub async fn poll_once(
        &self,
        scope: &ViewScope,
        job_id: JobId,
    ) -> Result<JobRecord, JobError> {
        Ok(scope.run(self.api.get_task(job_id)).await?)
    }

    /// Polls `job_id` until it reaches a terminal status.
    ///
    /// The first poll is immediate; re-poll `n` waits `base * 2^n` capped at
    /// `max`. Once the ttl is used up a [`JobEvent::TimedOut`] is emitted and
    /// the configured [`TimeoutPolicy`] decides whether to stop or to keep
    /// polling at the capped delay. `Failed` and `Exception` end in
    /// [`JobError::TerminalFailure`].
    pub async fn track(
        &self,
        scope: &ViewScope,
        job_id: JobId,
        sink: &dyn JobSink,
    ) -> Result<JobRecord, JobError> {
        let mut retries: u32 = 0;
        let mut timed_out = false;
        loop {
            if scope.is_cancelled() {
                return Err(JobError::Cancelled);
            }
            let record = self.poll_once(scope, job_id).await?;
            cb_debug!("Job {} poll {}: {}", job_id, retries + 1, record.status);
            sink.emit(JobEvent::Updated(record.clone()));
            if record.status.is_terminal() {
                return finish(record);
            }

            if !timed_out && self.schedule.is_exhausted(retries) {
                let attempts = retries + 1;
                cb_warn!(
                    "Job {} still {} after {} polls",
                    job_id,
                    record.status,
                    attempts
                );
                sink.emit(JobEvent::TimedOut { job_id, attempts });
                if self.schedule.on_timeout == TimeoutPolicy::GiveUp {
                    return Err(JobError::PollTimeout {
                        job_id,
                        status: record.status,
                        attempts,
                    });
                }
                timed_out = true;
            }

            let delay = if timed_out {
                self.schedule.max
            } else {
                self.schedule.delay(retries)
            };
            scope.sleep(delay).await?;
            retries = retries.saturating_add(1);
        }
    }

    /// Submits and, unless the server answers with a terminal record right
    /// away, tracks the new job. Nothing is polled if the submission fails.
    pub async fn submit_and_track(
        &self,
        scope: &ViewScope,
        request: &TaskRequest,
        sink: &dyn JobSink,
    ) -> Result<JobRecord, JobError> {
        let record = self.submit(scope, request).await?;
        sink.emit(JobEvent::Updated(record.clone()));
        if record.status.is_terminal() {
            return finish(record);
        }
        self.track(scope, record.id, sink).await
    }
}

fn finish(record: JobRecord) -> Result<JobRecord, JobError> {
    if record.status.is_failure() {
        cb_warn!("Job {} ended {}", record.id, record.status);
        return Err(JobError::TerminalFailure {
            job_id: record.id,
            status: record.status,
            message: record.message.unwrap_or_default(),
        });
    }
    cb_info!("Job {} ended {}", record.id, record.status);
    Ok(record)
}
