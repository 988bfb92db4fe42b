//! Freshness bookkeeping for section data held outside the bin, such as the
//! sections of a generated schedule.

use std::collections::HashSet;
use std::fmt;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::course::{CourseData, Timestamp};

/// How long fetched section data is trusted.
pub fn default_lifetime() -> Duration {
    Duration::minutes(10)
}

/// Refetch key: a course within a term.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CourseKey {
    pub course: String,
    pub term: String,
}

impl CourseKey {
    pub fn new(course: impl Into<String>, term: impl Into<String>) -> Self {
        Self {
            course: course.into(),
            term: term.into(),
        }
    }
}

impl fmt::Display for CourseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.term, self.course)
    }
}

/// A copy of a section held by a schedule or task view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledSection {
    #[serde(alias = "id")]
    pub section_id: String,
    pub course_name: String,
    pub term: String,
    #[serde(default)]
    pub updated: Option<Timestamp>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ScheduledSection {
    pub fn key(&self) -> CourseKey {
        CourseKey::new(self.course_name.clone(), self.term.clone())
    }
}

/// Data without a timestamp is always stale.
pub fn is_stale(updated: Option<Timestamp>, now: Timestamp, lifetime: Duration) -> bool {
    match updated {
        Some(updated) => now.signed_duration_since(updated) > lifetime,
        None => true,
    }
}

/// Split `sections` into `(stale, fresh)`, keeping input order in both.
pub fn partition_stale(
    sections: &[ScheduledSection],
    now: Timestamp,
    lifetime: Duration,
) -> (Vec<&ScheduledSection>, Vec<&ScheduledSection>) {
    sections
        .iter()
        .partition(|section| is_stale(section.updated, now, lifetime))
}

/// Distinct `(course, term)` pairs with at least one stale section, in order
/// of first appearance.
pub fn stale_course_keys(
    sections: &[ScheduledSection],
    now: Timestamp,
    lifetime: Duration,
) -> Vec<CourseKey> {
    let (stale, _) = partition_stale(sections, now, lifetime);
    let mut seen = HashSet::new();
    stale
        .into_iter()
        .map(ScheduledSection::key)
        .filter(|key| seen.insert(key.clone()))
        .collect()
}

/// Write the sections of a refetched course over every matching held copy.
///
/// Sections match on `(section id, term)`. Only fields present in the new
/// payload are replaced and `updated` becomes the course's timestamp.
/// Returns the number of copies updated.
pub fn merge_refreshed_sections(held: &mut [ScheduledSection], course: &CourseData) -> usize {
    let mut merged = 0;
    for section in held.iter_mut().filter(|s| s.term == course.term) {
        let Some(fresh) = course
            .sections
            .iter()
            .find(|fresh| fresh.section_id == section.section_id)
        else {
            continue;
        };
        if let Ok(Value::Object(fields)) = serde_json::to_value(fresh) {
            for (key, value) in fields {
                if key != "section_id" {
                    section.fields.insert(key, value);
                }
            }
        }
        section.updated = course.updated;
        merged += 1;
    }
    merged
}
