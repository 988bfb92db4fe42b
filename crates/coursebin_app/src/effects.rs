use std::sync::{mpsc, Arc};

use anyhow::Context;
use coursebin_client::{
    ChannelJobSink, JobClient, JobError, JobEvent, RefreshReport, SchedulerApi, SectionRefresher,
    ViewScope,
};
use coursebin_core::{Effect, JobRecord, Msg, ScheduledSection, Timestamp};
use coursebin_logging::{cb_debug, cb_info, cb_warn};
use futures_util::future::join_all;
use tokio::runtime::Runtime;

/// Executes effects against the API and turns their outcomes back into
/// messages.
///
/// All requests run on one current-thread runtime under a single
/// [`ViewScope`]; `Effect::CancelPending` cancels that scope, after which
/// every further request fails as cancelled.
pub struct EffectRunner {
    runtime: Runtime,
    api: Arc<dyn SchedulerApi>,
    jobs: JobClient,
    refresher: SectionRefresher,
    scope: ViewScope,
}

impl EffectRunner {
    pub fn new(
        api: Arc<dyn SchedulerApi>,
        jobs: JobClient,
        refresher: SectionRefresher,
    ) -> anyhow::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("starting async runtime")?;
        Ok(Self {
            runtime,
            api,
            jobs,
            refresher,
            scope: ViewScope::new(),
        })
    }

    /// Runs `effects` concurrently and returns the resulting messages in
    /// effect order.
    pub fn run(&self, effects: Vec<Effect>) -> Vec<Msg> {
        let mut pending = Vec::new();
        for effect in effects {
            if matches!(effect, Effect::CancelPending) {
                cb_info!("Cancelling pending requests");
                self.scope.cancel();
            } else {
                pending.push(effect);
            }
        }
        if pending.is_empty() {
            return Vec::new();
        }
        let outcomes = self
            .runtime
            .block_on(join_all(pending.into_iter().map(|effect| self.execute(effect))));
        outcomes.into_iter().flatten().collect()
    }

    async fn execute(&self, effect: Effect) -> Vec<Msg> {
        cb_debug!("Executing {:?}", effect);
        match effect {
            Effect::FetchCourse { term, course } => {
                let result = self
                    .scope
                    .run(self.api.fetch_course(&term, &course))
                    .await
                    .map_err(|err| format!("failed to fetch {term}:{course}: {err}"));
                vec![Msg::CourseFetched { course, result }]
            }
            Effect::SubmitJob(request) => {
                let (sink, events) = job_channel();
                let outcome = self
                    .jobs
                    .submit_and_track(&self.scope, &request, &sink)
                    .await;
                job_msgs(events, outcome)
            }
            Effect::TrackJob { job_id } => {
                let (sink, events) = job_channel();
                let outcome = self.jobs.track(&self.scope, job_id, &sink).await;
                job_msgs(events, outcome)
            }
            Effect::LoadProfile { kind, id } => {
                let result = self
                    .scope
                    .run(self.api.load_profile(kind, id))
                    .await
                    .map_err(|err| format!("failed to load {kind} {id}: {err}"));
                vec![Msg::ProfileLoaded(result)]
            }
            Effect::SaveProfile { kind, id, profile } => {
                let result = self
                    .scope
                    .run(self.api.save_profile(kind, id, &profile))
                    .await
                    .map(|()| id)
                    .map_err(|err| format!("failed to save {kind} {id}: {err}"));
                vec![Msg::ProfileSaved(result)]
            }
            Effect::CancelPending => Vec::new(),
        }
    }

    /// Refetches stale sections of saved schedule `schedule_id`.
    pub fn check_sections(
        &self,
        schedule_id: u64,
        now: Timestamp,
    ) -> anyhow::Result<(Vec<ScheduledSection>, RefreshReport)> {
        self.runtime.block_on(async {
            let mut sections = self
                .scope
                .run(self.api.schedule_sections(schedule_id))
                .await
                .with_context(|| format!("loading schedule {schedule_id}"))?;
            let report = self
                .refresher
                .refresh(&self.scope, &mut sections, now)
                .await;
            Ok((sections, report))
        })
    }
}

fn job_channel() -> (ChannelJobSink, mpsc::Receiver<JobEvent>) {
    let (tx, rx) = mpsc::channel();
    (ChannelJobSink::new(tx), rx)
}

/// Replays the events a job emitted as messages. Terminal failures and
/// timeouts already arrived as events; only request errors add a message.
fn job_msgs(events: mpsc::Receiver<JobEvent>, outcome: Result<JobRecord, JobError>) -> Vec<Msg> {
    let mut msgs: Vec<Msg> = events
        .try_iter()
        .map(|event| match event {
            JobEvent::Updated(record) => Msg::JobUpdated(record),
            JobEvent::TimedOut { job_id, attempts } => Msg::JobPollTimedOut { job_id, attempts },
        })
        .collect();
    match outcome {
        Ok(record) => cb_info!("Job {} finished: {}", record.id, record.status),
        Err(JobError::TerminalFailure { .. } | JobError::PollTimeout { .. }) => {}
        Err(JobError::Cancelled) => cb_info!("Job tracking cancelled"),
        Err(JobError::Api(err)) => {
            cb_warn!("Job request failed: {}", err);
            msgs.push(Msg::JobRequestFailed(err.to_string()));
        }
    }
    msgs
}
