use coursebin_client::{ApiSettings, FailureKind, ReqwestApi, SchedulerApi, ViewScope};
use coursebin_core::{JobStatus, Preferences, ProfileKind, SavedProfile, TaskRequest};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn api(server: &MockServer) -> ReqwestApi {
    ReqwestApi::new(ApiSettings {
        base_url: format!("{}/api", server.uri()),
        ..ApiSettings::default()
    })
    .expect("client")
}

fn course_body() -> serde_json::Value {
    json!({
        "name": "csci-201",
        "term": "20201",
        "updated": "2020-01-10T12:00:00Z",
        "sections": [
            {"section_id": "29911", "section_type": "Lecture", "instructor": "Goodney",
             "room_hint": "SGM 123"},
            {"section_id": "29912", "section_type": "Lab"}
        ]
    })
}

#[tokio::test]
async fn fetch_course_puts_and_parses() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/courses/20201/csci-201/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(course_body()))
        .expect(1)
        .mount(&server)
        .await;

    let course = api(&server).fetch_course("20201", "csci-201").await.unwrap();

    assert_eq!(course.name, "csci-201");
    assert_eq!(course.sections.len(), 2);
    assert_eq!(course.sections[0].instructor.as_deref(), Some("Goodney"));
    assert_eq!(course.sections[0].extra.get("room_hint"), Some(&json!("SGM 123")));
}

#[tokio::test]
async fn fetch_course_reports_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = api(&server).fetch_course("20201", "nope").await.unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(404));
}

#[tokio::test]
async fn fetch_course_rejects_sections_without_type() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "csci-201",
            "term": "20201",
            "sections": [{"section_id": "1"}]
        })))
        .mount(&server)
        .await;

    let err = api(&server).fetch_course("20201", "csci-201").await.unwrap_err();
    assert_eq!(err.kind, FailureKind::InvalidCourseData);
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tasks/7/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(64)))
        .mount(&server)
        .await;

    let api = ReqwestApi::new(ApiSettings {
        base_url: format!("{}/api/", server.uri()),
        max_bytes: 16,
        ..ApiSettings::default()
    })
    .unwrap();
    let err = api.get_task(7).await.unwrap_err();
    assert!(matches!(err.kind, FailureKind::TooLarge { max_bytes: 16, .. }));
}

#[tokio::test]
async fn job_without_status_is_invalid() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tasks/7/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 7})))
        .mount(&server)
        .await;

    let err = api(&server).get_task(7).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::InvalidResponse);
}

#[tokio::test]
async fn submit_posts_bin_with_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/tasks/"))
        .and(header("authorization", "Bearer s3cret"))
        .and(body_partial_json(json!({"name": "spring", "coursebin": []})))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({"id": 42, "status": "PD"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let api = ReqwestApi::new(ApiSettings {
        base_url: format!("{}/api/", server.uri()),
        access_token: Some("s3cret".to_string()),
        ..ApiSettings::default()
    })
    .unwrap();
    let record = api
        .submit_task(&TaskRequest {
            coursebin: json!([]),
            preference: Preferences::default(),
            name: Some("spring".to_string()),
        })
        .await
        .unwrap();

    assert_eq!(record.id, 42);
    assert_eq!(record.status, JobStatus::Pending);
}

#[tokio::test]
async fn profiles_round_trip_through_task_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/task-data/3/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "coursebin": [],
            "preference": {"early_time": "09:00"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/api/task-data/3/"))
        .and(body_partial_json(json!({"preference": {"early_time": "09:00"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let api = api(&server);
    let profile: SavedProfile = api.load_profile(ProfileKind::TaskData, 3).await.unwrap();
    assert_eq!(profile.preference.early_time.as_deref(), Some("09:00"));
    api.save_profile(ProfileKind::TaskData, 3, &profile)
        .await
        .unwrap();
}

#[tokio::test]
async fn schedule_sections_are_read_from_schedule() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/schedules/5/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "plan a",
            "sections": [
                {"id": "29911", "course_name": "csci-201", "term": "20201",
                 "updated": "2020-01-10T12:00:00Z", "instructor": "Old"}
            ]
        })))
        .mount(&server)
        .await;

    let sections = api(&server).schedule_sections(5).await.unwrap();
    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].section_id, "29911");
    assert_eq!(sections[0].fields.get("instructor"), Some(&json!("Old")));
}

#[tokio::test]
async fn cancelled_scope_aborts_request() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(course_body())
                .set_delay(std::time::Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let api = api(&server);
    let scope = ViewScope::new();
    let token = scope.token();
    let request = scope.run(api.fetch_course("20201", "csci-201"));
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        token.cancel();
    });

    let err = request.await.unwrap_err();
    assert!(err.is_cancelled());
}
