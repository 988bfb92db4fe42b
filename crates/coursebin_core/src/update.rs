use coursebin_logging::{cb_debug, cb_warn};

use crate::state::NoticeLevel;
use crate::{AppState, Coursebin, Effect, JobRecord, JobStatus, Msg, SavedProfile, TaskRequest};

/// Pure update function: applies a message to state and returns any effects.
///
/// Every coursebin edit runs to completion here, so an observer of the
/// returned state never sees half of an operation.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::AddCourseRequested { term, course } => {
            let (term, course) = (term.trim(), course.trim());
            if term.is_empty() || course.is_empty() {
                state.push_notice(
                    NoticeLevel::Error,
                    "\"Term\" and \"Course\" must not be empty.",
                );
                return (state, Vec::new());
            }
            if !state.begin_loading(course) {
                cb_debug!("Fetch for {} already in flight; skipping", course);
                return (state, Vec::new());
            }
            if !state.coursebin().contains_course(course) {
                state.coursebin_mut().add_loading(course);
            }
            vec![Effect::FetchCourse {
                term: term.to_string(),
                course: course.to_string(),
            }]
        }
        Msg::RefreshStaleCourses { now, lifetime } => {
            let stale = state.coursebin().stale_courses(now, lifetime);
            stale
                .into_iter()
                .filter(|key| state.begin_loading(&key.course))
                .map(|key| Effect::FetchCourse {
                    term: key.term,
                    course: key.course,
                })
                .collect()
        }
        Msg::CourseFetched { course, result } => {
            state.finish_loading(&course);
            let merged = result.and_then(|data| {
                state
                    .coursebin_mut()
                    .merge_course(&data)
                    .map_err(|err| format!("{course}: {err}"))
            });
            if let Err(message) = merged {
                cb_warn!("Course {} not merged: {}", course, message);
                state.push_notice(NoticeLevel::Error, message);
            }
            Vec::new()
        }
        Msg::DeleteCourse(course) => {
            if state.coursebin_mut().delete_course(&course) > 0 {
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::ToggleExclude(node_id) => {
            edit_bin(&mut state, |bin| bin.toggle_exclude(node_id.as_str()));
            Vec::new()
        }
        Msg::ToggleExempt(node_id) => {
            edit_bin(&mut state, |bin| bin.toggle_exempt(node_id.as_str()));
            Vec::new()
        }
        Msg::SetExemptRecursive { node_id, value } => {
            edit_bin(&mut state, |bin| {
                bin.recursive_set_exempt(node_id.as_str(), value) > 0
            });
            Vec::new()
        }
        Msg::SetGroup { node_id, group } => {
            edit_bin(&mut state, |bin| bin.set_group(node_id.as_str(), group));
            Vec::new()
        }
        Msg::StartGroupFromOne => {
            edit_bin(&mut state, |bin| {
                bin.start_group_from_one();
                true
            });
            Vec::new()
        }
        Msg::ResetGroups => {
            edit_bin(&mut state, |bin| {
                bin.reset_groups();
                true
            });
            Vec::new()
        }
        Msg::SetIncludeAll(included) => {
            edit_bin(&mut state, |bin| bin.set_include_all(included) > 0);
            Vec::new()
        }
        Msg::PreferenceEdited { key, value } => {
            if let Err(err) = state.preferences_mut().set(&key, &value) {
                state.push_notice(NoticeLevel::Error, format!("{key}: {err}"));
            }
            Vec::new()
        }
        Msg::ReservedSlotAdded(slot) => {
            let key = slot.key.clone();
            if let Err(err) = state.preferences_mut().add_reserved(slot) {
                state.push_notice(NoticeLevel::Error, format!("{key}: {err}"));
            }
            Vec::new()
        }
        Msg::ReservedSlotsRemoved(keys) => {
            let known = state
                .preferences()
                .reserved
                .iter()
                .any(|slot| keys.contains(&slot.key));
            if known {
                state.preferences_mut().remove_reserved(&keys);
            } else {
                state.push_notice(
                    NoticeLevel::Warning,
                    format!("No reserved slot named {}.", keys.join(", ")),
                );
            }
            Vec::new()
        }
        Msg::SubmitClicked { name } => {
            if state.coursebin().course_roots().next().is_none() {
                state.push_notice(NoticeLevel::Warning, "The coursebin is empty.");
                return (state, Vec::new());
            }
            match state.coursebin().to_saved() {
                Ok(coursebin) => {
                    let request = TaskRequest {
                        coursebin,
                        preference: state.preferences().clone(),
                        name: name.filter(|name| !name.trim().is_empty()),
                    };
                    state.start_job();
                    vec![Effect::SubmitJob(request)]
                }
                Err(err) => {
                    state.push_notice(NoticeLevel::Error, err.to_string());
                    Vec::new()
                }
            }
        }
        Msg::TrackJobRequested(job_id) => {
            state.start_job();
            vec![Effect::TrackJob { job_id }]
        }
        Msg::JobUpdated(record) => {
            let changed = state
                .job()
                .is_none_or(|job| job.id != record.id || job.status != record.status);
            if changed {
                if let Some((level, text)) = job_notice(&record) {
                    state.push_notice(level, text);
                }
            }
            state.set_job(record);
            Vec::new()
        }
        Msg::JobPollTimedOut { job_id, attempts } => {
            state.mark_job_timed_out();
            state.push_notice(
                NoticeLevel::Warning,
                format!(
                    "Timeout: job {job_id} is still pending after {attempts} polls. \
                     It may still complete later."
                ),
            );
            Vec::new()
        }
        Msg::JobRequestFailed(message) => {
            state.stop_job_tracking();
            state.push_notice(NoticeLevel::Error, message);
            Vec::new()
        }
        Msg::ProfileLoadRequested { kind, id } => vec![Effect::LoadProfile { kind, id }],
        Msg::ProfileSaveRequested { kind, id } => match state.coursebin().to_saved() {
            Ok(coursebin) => vec![Effect::SaveProfile {
                kind,
                id,
                profile: SavedProfile {
                    coursebin,
                    preference: state.preferences().clone(),
                },
            }],
            Err(err) => {
                state.push_notice(NoticeLevel::Error, err.to_string());
                Vec::new()
            }
        },
        Msg::ProfileLoaded(Ok(profile)) => {
            let loaded = if profile.coursebin.is_null() {
                Ok(Coursebin::new())
            } else {
                Coursebin::load_saved(profile.coursebin)
            };
            match loaded {
                Ok(bin) => state.replace_profile(bin, profile.preference),
                Err(err) => state.push_notice(NoticeLevel::Error, err.to_string()),
            }
            Vec::new()
        }
        Msg::ProfileLoaded(Err(message)) => {
            state.push_notice(NoticeLevel::Error, message);
            Vec::new()
        }
        Msg::ProfileSaved(Ok(id)) => {
            state.push_notice(NoticeLevel::Info, format!("Saved profile {id}."));
            Vec::new()
        }
        Msg::ProfileSaved(Err(message)) => {
            state.push_notice(NoticeLevel::Error, message);
            Vec::new()
        }
        Msg::ViewClosed => {
            state.stop_job_tracking();
            vec![Effect::CancelPending]
        }
    };

    (state, effects)
}

/// Applies a coursebin edit and marks the state dirty if it took effect.
/// Edits naming unknown nodes are silently ignored.
fn edit_bin(state: &mut AppState, edit: impl FnOnce(&mut Coursebin) -> bool) {
    if edit(state.coursebin_mut()) {
        state.mark_dirty();
    } else {
        cb_debug!("Coursebin edit had no effect");
    }
}

fn job_notice(record: &JobRecord) -> Option<(NoticeLevel, String)> {
    let message = record.message.clone().unwrap_or_default();
    match record.status {
        JobStatus::Pending | JobStatus::Processing => None,
        JobStatus::Done => Some((
            NoticeLevel::Info,
            format!(
                "{}: {} valid schedules found.",
                record.display_name(),
                record.count.unwrap_or(record.schedules.len() as u64)
            ),
        )),
        JobStatus::Warning => Some((NoticeLevel::Warning, message)),
        JobStatus::Failed => Some((NoticeLevel::Error, message)),
        JobStatus::Exception => Some((
            NoticeLevel::Error,
            format!(
                "Sorry, we encountered an issue generating schedules for you, \
                 send us a message with this error code: {message}."
            ),
        )),
    }
}
