use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::view_model::{AppViewModel, ComponentRow, CourseRow, JobView, SectionRow};
use crate::{Coursebin, JobRecord, NodeKind, Preferences};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A message for the user, shown until the view drains it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

/// The part of [`AppState`] that outlives a session.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StateSnapshot {
    #[serde(default)]
    pub coursebin: Coursebin,
    #[serde(default)]
    pub preferences: Preferences,
    #[serde(default)]
    pub job: Option<JobRecord>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    coursebin: Coursebin,
    preferences: Preferences,
    /// Courses with a fetch in flight.
    loading: BTreeSet<String>,
    job: Option<JobRecord>,
    job_tracking: bool,
    job_timed_out: bool,
    notices: Vec<Notice>,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: StateSnapshot) -> Self {
        Self {
            coursebin: snapshot.coursebin,
            preferences: snapshot.preferences,
            job: snapshot.job,
            ..Self::default()
        }
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            coursebin: self.coursebin.clone(),
            preferences: self.preferences.clone(),
            job: self.job.clone(),
        }
    }

    pub fn coursebin(&self) -> &Coursebin {
        &self.coursebin
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn job(&self) -> Option<&JobRecord> {
        self.job.as_ref()
    }

    pub fn is_loading(&self, course: &str) -> bool {
        self.loading.contains(course)
    }

    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Callers mark the state dirty themselves once an edit took effect.
    pub(crate) fn coursebin_mut(&mut self) -> &mut Coursebin {
        &mut self.coursebin
    }

    pub(crate) fn preferences_mut(&mut self) -> &mut Preferences {
        self.dirty = true;
        &mut self.preferences
    }

    /// Claims the fetch slot for `course`. False if one is already running.
    pub(crate) fn begin_loading(&mut self, course: &str) -> bool {
        let inserted = self.loading.insert(course.to_string());
        if inserted {
            self.dirty = true;
        }
        inserted
    }

    pub(crate) fn finish_loading(&mut self, course: &str) {
        self.loading.remove(course);
        self.coursebin.remove_loading(course);
        self.dirty = true;
    }

    pub(crate) fn replace_profile(&mut self, coursebin: Coursebin, preferences: Preferences) {
        self.coursebin = coursebin;
        self.preferences = preferences;
        self.dirty = true;
    }

    pub(crate) fn start_job(&mut self) {
        self.job = None;
        self.job_tracking = true;
        self.job_timed_out = false;
        self.dirty = true;
    }

    pub(crate) fn set_job(&mut self, record: JobRecord) {
        self.job_tracking = !record.status.is_terminal();
        if !self.job_tracking {
            self.job_timed_out = false;
        }
        self.job = Some(record);
        self.dirty = true;
    }

    pub(crate) fn mark_job_timed_out(&mut self) {
        self.job_timed_out = true;
        self.dirty = true;
    }

    pub(crate) fn stop_job_tracking(&mut self) {
        if std::mem::take(&mut self.job_tracking) {
            self.dirty = true;
        }
    }

    pub(crate) fn push_notice(&mut self, level: NoticeLevel, text: impl Into<String>) {
        self.notices.push(Notice {
            level,
            text: text.into(),
        });
        self.dirty = true;
    }

    pub fn view(&self) -> AppViewModel {
        let bin = &self.coursebin;
        let mut courses: Vec<CourseRow> = bin
            .nodes()
            .iter()
            .filter(|node| node.kind == NodeKind::Course)
            .map(|root| {
                let (active, total) = bin.section_counts(root.node_id.as_str());
                let components = bin
                    .descendants(root.node_id.as_str())
                    .into_iter()
                    .filter(|node| node.kind == NodeKind::Component)
                    .map(|component| {
                        let sections: Vec<SectionRow> = bin
                            .children(component.node_id.as_str())
                            .map(|section| SectionRow {
                                node_id: section.node_id.clone(),
                                section_id: section
                                    .section
                                    .as_ref()
                                    .map(|data| data.section_id.clone())
                                    .unwrap_or_default(),
                                exclude: section.exclude,
                                exempt: section.exempt,
                                data: section.section.clone(),
                            })
                            .collect();
                        ComponentRow {
                            node_id: component.node_id.clone(),
                            part: component.part.unwrap_or_default(),
                            name: component.component.clone().unwrap_or_default(),
                            active: sections.iter().filter(|s| !s.exclude).count(),
                            sections,
                        }
                    })
                    .collect();
                CourseRow {
                    node_id: root.node_id.clone(),
                    course: root.course.clone(),
                    term: root.term.clone(),
                    group: root.group,
                    loading: root.loading,
                    exclude: root.exclude,
                    exempt: root.exempt,
                    updated: root.updated,
                    active_sections: active,
                    total_sections: total,
                    components,
                }
            })
            .collect();
        // Loading placeholders have no group yet and sort last.
        courses.sort_by(|a, b| {
            a.group
                .unwrap_or(u32::MAX)
                .cmp(&b.group.unwrap_or(u32::MAX))
                .then_with(|| a.node_id.cmp(&b.node_id))
        });

        AppViewModel {
            courses,
            loading: self.loading.iter().cloned().collect(),
            job: self.job.as_ref().map(|record| JobView {
                id: record.id,
                name: record.display_name(),
                status: record.status,
                message: record.message.clone(),
                schedule_count: record.count,
                tracking: self.job_tracking,
                timed_out: self.job_timed_out,
            }),
            notices: self.notices.clone(),
            dirty: self.dirty,
        }
    }
}
