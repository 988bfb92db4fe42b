use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Duration;
use coursebin_core::{
    merge_refreshed_sections, stale_course_keys, CourseKey, ScheduledSection, Timestamp,
};
use coursebin_logging::{cb_debug, cb_info, cb_warn};
use futures_util::future::join_all;

use crate::{ApiError, SchedulerApi, ViewScope};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RefreshReport {
    pub refreshed: Vec<CourseKey>,
    pub failed: Vec<(CourseKey, ApiError)>,
    /// Stale keys left alone because another refresh already had them in
    /// flight.
    pub skipped: Vec<CourseKey>,
    /// Held section copies overwritten with fresh data.
    pub merged: usize,
}

type InFlight = Arc<Mutex<HashSet<CourseKey>>>;

/// Refetches the courses behind stale schedule sections.
///
/// Clones share the in-flight set, so concurrent refreshes never fetch the
/// same `(course, term)` twice.
#[derive(Clone)]
pub struct SectionRefresher {
    api: Arc<dyn SchedulerApi>,
    lifetime: Duration,
    in_flight: InFlight,
}

/// Holds a key in the in-flight set until dropped.
struct InFlightClaim {
    in_flight: InFlight,
    key: CourseKey,
}

impl InFlightClaim {
    fn try_new(in_flight: &InFlight, key: CourseKey) -> Option<Self> {
        let inserted = in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone());
        inserted.then(|| Self {
            in_flight: Arc::clone(in_flight),
            key,
        })
    }
}

impl Drop for InFlightClaim {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

impl SectionRefresher {
    pub fn new(api: Arc<dyn SchedulerApi>, lifetime: Duration) -> Self {
        Self {
            api,
            lifetime,
            in_flight: Arc::default(),
        }
    }

    /// Issues one fetch per distinct stale `(course, term)` in `sections`
    /// and merges each result into every matching held copy. Fresh sections
    /// and sections of failed fetches are left untouched.
    pub async fn refresh(
        &self,
        scope: &ViewScope,
        sections: &mut [ScheduledSection],
        now: Timestamp,
    ) -> RefreshReport {
        let mut report = RefreshReport::default();
        let mut claims = Vec::new();
        for key in stale_course_keys(sections, now, self.lifetime) {
            match InFlightClaim::try_new(&self.in_flight, key.clone()) {
                Some(claim) => claims.push(claim),
                None => {
                    cb_debug!("Refresh of {} already in flight", key);
                    report.skipped.push(key);
                }
            }
        }

        let fetches = claims.iter().map(|claim| async move {
            let key = &claim.key;
            let result = scope
                .run(self.api.fetch_course(&key.term, &key.course))
                .await;
            (key.clone(), result)
        });
        let results = join_all(fetches).await;
        drop(claims);

        for (key, result) in results {
            match result {
                Ok(course) => {
                    let merged = merge_refreshed_sections(sections, &course);
                    cb_info!("Refreshed {}: {} held sections updated", key, merged);
                    report.merged += merged;
                    report.refreshed.push(key);
                }
                Err(err) => {
                    cb_warn!("Refresh of {} failed: {}", key, err);
                    report.failed.push((key, err));
                }
            }
        }
        report
    }
}
