use std::sync::Once;

use coursebin_core::{
    update, AppState, CourseData, Effect, Msg, NodeId, NoticeLevel, ProfileKind, ReservedSlot,
    SavedProfile, SectionData,
};
use serde_json::json;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(coursebin_logging::initialize_for_tests);
}

fn csci() -> CourseData {
    CourseData {
        name: "csci-201".to_string(),
        term: "20201".to_string(),
        updated: "2020-01-10T12:00:00Z".parse().ok(),
        sections: vec![
            SectionData::new("29911", "Lecture"),
            SectionData::new("29912", "Lab"),
        ],
    }
}

fn request(state: AppState, term: &str, course: &str) -> (AppState, Vec<Effect>) {
    update(
        state,
        Msg::AddCourseRequested {
            term: term.to_string(),
            course: course.to_string(),
        },
    )
}

fn with_course() -> AppState {
    let (state, _) = request(AppState::new(), "20201", "csci-201");
    let (mut state, _) = update(
        state,
        Msg::CourseFetched {
            course: "csci-201".to_string(),
            result: Ok(csci()),
        },
    );
    state.consume_dirty();
    state
}

#[test]
fn add_course_shows_placeholder_and_fetches() {
    init_logging();
    let (mut state, effects) = request(AppState::new(), " 20201 ", " csci-201 ");

    assert_eq!(
        effects,
        vec![Effect::FetchCourse {
            term: "20201".to_string(),
            course: "csci-201".to_string(),
        }]
    );
    assert!(state.is_loading("csci-201"));
    let view = state.view();
    assert_eq!(view.courses.len(), 1);
    assert!(view.courses[0].loading);
    assert!(state.consume_dirty());
}

#[test]
fn duplicate_fetch_is_not_issued_while_loading() {
    init_logging();
    let (state, _) = request(AppState::new(), "20201", "csci-201");
    let (state, effects) = request(state, "20201", "csci-201");

    assert!(effects.is_empty());
    assert_eq!(state.coursebin().len(), 1);
}

#[test]
fn empty_input_reports_error() {
    init_logging();
    let (mut state, effects) = request(AppState::new(), "", "csci-201");

    assert!(effects.is_empty());
    let notices = state.take_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Error);
}

#[test]
fn fetched_course_replaces_placeholder() {
    init_logging();
    let state = with_course();

    assert!(!state.is_loading("csci-201"));
    assert!(state.coursebin().get("csci-201.loading").is_none());
    let view = state.view();
    assert_eq!(view.courses.len(), 1);
    assert_eq!(view.courses[0].group, Some(1));
    assert_eq!(view.courses[0].total_sections, 2);
    assert_eq!(view.courses[0].components.len(), 2);
}

#[test]
fn failed_fetch_clears_loading_without_mutation() {
    init_logging();
    let (state, _) = request(AppState::new(), "20201", "csci-201");
    let (mut state, effects) = update(
        state,
        Msg::CourseFetched {
            course: "csci-201".to_string(),
            result: Err("[404] failed to fetch 20201:csci-201".to_string()),
        },
    );

    assert!(effects.is_empty());
    assert!(!state.is_loading("csci-201"));
    assert!(state.coursebin().is_empty());
    assert_eq!(state.take_notices()[0].level, NoticeLevel::Error);
}

#[test]
fn malformed_course_is_reported_and_bin_kept() {
    init_logging();
    let state = with_course();
    let before = state.coursebin().clone();

    let (state, _) = request(state, "20201", "csci-201");
    let mut broken = csci();
    broken.sections[0].section_id.clear();
    let (mut state, _) = update(
        state,
        Msg::CourseFetched {
            course: "csci-201".to_string(),
            result: Ok(broken),
        },
    );

    assert_eq!(state.coursebin(), &before);
    assert_eq!(state.take_notices().len(), 1);
}

#[test]
fn refetch_of_known_course_adds_no_placeholder() {
    init_logging();
    let (state, effects) = request(with_course(), "20201", "csci-201");
    assert_eq!(effects.len(), 1);
    assert!(state.coursebin().get("csci-201.loading").is_none());
}

#[test]
fn stale_courses_are_refreshed_once() {
    init_logging();
    let state = with_course();
    let msg = Msg::RefreshStaleCourses {
        now: "2020-01-10T13:00:00Z".parse().unwrap(),
        lifetime: coursebin_core::default_lifetime(),
    };

    let (state, effects) = update(state, msg.clone());
    assert_eq!(effects.len(), 1);

    let (_state, effects) = update(state, msg);
    assert!(effects.is_empty());
}

#[test]
fn edits_on_unknown_nodes_do_not_dirty_state() {
    init_logging();
    let state = with_course();
    let before = state.clone();

    let (mut next, effects) = update(state, Msg::ToggleExclude(NodeId::new("gone.0.Lab.1")));

    assert!(effects.is_empty());
    assert!(!next.consume_dirty());
    assert_eq!(next, before);
}

#[test]
fn flag_edits_mark_dirty() {
    init_logging();
    let (mut state, _) = update(with_course(), Msg::ToggleExempt(NodeId::new("csci-201.0.Lab")));
    assert!(state.consume_dirty());
    assert!(state.coursebin().get("csci-201.0.Lab").unwrap().exempt);

    let (mut state, _) = update(
        state,
        Msg::SetExemptRecursive {
            node_id: NodeId::new("csci-201"),
            value: true,
        },
    );
    assert!(state.consume_dirty());
    assert!(state.coursebin().nodes().iter().all(|n| n.exempt));

    let (state, _) = update(state, Msg::SetIncludeAll(false));
    assert_eq!(state.view().courses[0].active_sections, 0);
}

#[test]
fn delete_course_empties_bin() {
    init_logging();
    let (mut state, _) = update(with_course(), Msg::DeleteCourse("csci-201".to_string()));
    assert!(state.coursebin().is_empty());
    assert!(state.consume_dirty());
}

#[test]
fn courses_are_listed_by_group() {
    init_logging();
    let state = with_course();
    let (state, _) = request(state, "20201", "math-225");
    let (state, _) = update(
        state,
        Msg::CourseFetched {
            course: "math-225".to_string(),
            result: Ok(CourseData {
                name: "math-225".to_string(),
                ..csci()
            }),
        },
    );
    let (state, _) = update(
        state,
        Msg::SetGroup {
            node_id: NodeId::new("csci-201"),
            group: 5,
        },
    );

    let order: Vec<_> = state.view().courses.iter().map(|c| c.course.clone()).collect();
    assert_eq!(order, vec!["math-225".to_string(), "csci-201".to_string()]);

    let (state, _) = update(state, Msg::StartGroupFromOne);
    let groups: Vec<_> = state
        .view()
        .courses
        .iter()
        .map(|c| (c.course.clone(), c.group))
        .collect();
    assert_eq!(
        groups,
        vec![
            ("math-225".to_string(), Some(1)),
            ("csci-201".to_string(), Some(2))
        ]
    );
}

#[test]
fn invalid_preference_is_reported() {
    init_logging();
    let (mut state, _) = update(
        AppState::new(),
        Msg::PreferenceEdited {
            key: "early_time".to_string(),
            value: "noon".to_string(),
        },
    );
    assert_eq!(state.preferences().early_time, None);
    assert_eq!(state.take_notices().len(), 1);
}

fn lunch(end: &str) -> ReservedSlot {
    ReservedSlot {
        key: "lunch".to_string(),
        begin: "11:30".to_string(),
        end: end.to_string(),
        length: "0:45".to_string(),
        weight: 50,
    }
}

#[test]
fn reserved_slots_are_added_and_removed() {
    init_logging();
    let (mut state, _) = update(AppState::new(), Msg::ReservedSlotAdded(lunch("12:30")));
    assert!(state.consume_dirty());
    assert_eq!(state.preferences().reserved.len(), 1);

    let (mut state, _) = update(state, Msg::ReservedSlotAdded(lunch("25:00")));
    assert_eq!(state.take_notices()[0].level, NoticeLevel::Error);
    assert_eq!(state.preferences().reserved[0].end, "12:30");

    let (mut state, _) = update(state, Msg::ReservedSlotsRemoved(vec!["gym".to_string()]));
    assert_eq!(state.take_notices()[0].level, NoticeLevel::Warning);
    assert_eq!(state.preferences().reserved.len(), 1);

    let (state, _) = update(state, Msg::ReservedSlotsRemoved(vec!["lunch".to_string()]));
    assert!(state.preferences().reserved.is_empty());
}

#[test]
fn profile_save_carries_bin_and_preferences() {
    init_logging();
    let (state, _) = update(
        with_course(),
        Msg::PreferenceEdited {
            key: "late_time".to_string(),
            value: "18:00".to_string(),
        },
    );
    let (_state, effects) = update(
        state,
        Msg::ProfileSaveRequested {
            kind: ProfileKind::TaskData,
            id: 12,
        },
    );

    match effects.as_slice() {
        [Effect::SaveProfile { kind, id, profile }] => {
            assert_eq!(*kind, ProfileKind::TaskData);
            assert_eq!(*id, 12);
            assert_eq!(profile.preference.late_time.as_deref(), Some("18:00"));
            assert_eq!(profile.coursebin.as_array().map(Vec::len), Some(6));
        }
        other => panic!("unexpected effects {other:?}"),
    }
}

#[test]
fn loaded_profile_replaces_bin() {
    init_logging();
    let source = with_course();
    let saved = source.coursebin().to_saved().unwrap();

    let (state, _) = update(
        AppState::new(),
        Msg::ProfileLoaded(Ok(SavedProfile {
            coursebin: saved,
            preference: Default::default(),
        })),
    );
    assert_eq!(state.coursebin(), source.coursebin());
}

#[test]
fn broken_profile_is_rejected() {
    init_logging();
    let state = with_course();
    let before = state.coursebin().clone();
    let (mut state, _) = update(
        state,
        Msg::ProfileLoaded(Ok(SavedProfile {
            coursebin: json!([{"node_id": "x.0", "parent": "x", "type": "part", "course": "x"}]),
            preference: Default::default(),
        })),
    );
    assert_eq!(state.coursebin(), &before);
    assert_eq!(state.take_notices()[0].level, NoticeLevel::Error);
}
