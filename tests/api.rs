use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::DateTime;
use gcal_events::api::{router, AppState};
use gcal_events::components::google_calendar::models::EventDateTime;
use gcal_events::components::{CalendarEvent, CalendarService, DeleteOutcome, InMemoryCalendar};
use gcal_events::error::{AppResult, Error};
use gcal_events::models::{EventDto, NewEventRequest, PagedEvents, SearchCriteria};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

// 2030-01-07 is a Monday, 2030-01-04 a Friday
const MONDAY_START: &str = "2030-01-07T09:00:00Z";
const MONDAY_END: &str = "2030-01-07T09:30:00Z";

fn event(id: &str, summary: &str, start: &str, end: &str) -> CalendarEvent {
    CalendarEvent {
        id: id.to_string(),
        status: Some("confirmed".to_string()),
        summary: Some(summary.to_string()),
        start: Some(EventDateTime::at(DateTime::parse_from_rfc3339(start).unwrap())),
        end: Some(EventDateTime::at(DateTime::parse_from_rfc3339(end).unwrap())),
        ..Default::default()
    }
}

fn app_with(calendar: Arc<InMemoryCalendar>) -> Router {
    router(AppState::new(calendar))
}

async fn call(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Option<String>, Vec<u8>) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let location = response
        .headers()
        .get(header::LOCATION)
        .map(|value| value.to_str().unwrap().to_string());
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, location, bytes.to_vec())
}

fn error_message(body: &[u8]) -> String {
    let value: Value = serde_json::from_slice(body).unwrap();
    value["error"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_check_answers_ok() {
    let (status, _, body) = call(app_with(Arc::default()), Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK");
}

#[tokio::test]
async fn create_returns_created_event_and_location() {
    let calendar = Arc::new(InMemoryCalendar::new());
    let body = json!({
        "summary": "Planning",
        "description": "Quarterly planning",
        "start": MONDAY_START,
        "end": MONDAY_END,
        "attachments": [{"fileId": "f1", "fileUrl": "https://example.com/f1"}]
    });

    let (status, location, bytes) =
        call(app_with(calendar.clone()), Method::POST, "/api/events", Some(body)).await;

    assert_eq!(status, StatusCode::CREATED);
    let created: EventDto = serde_json::from_slice(&bytes).unwrap();
    let id = created.id.clone().unwrap();
    assert_eq!(location, Some(format!("/api/events/{}", id)));
    assert_eq!(created.summary.as_deref(), Some("Planning"));
    assert_eq!(created.attachments.unwrap()[0].file_id, "f1");
    assert_eq!(calendar.len().await, 1);
}

#[tokio::test]
async fn create_rejects_missing_fields() {
    let calendar = Arc::new(InMemoryCalendar::new());
    let body = json!({ "summary": "No times" });

    let (status, _, bytes) =
        call(app_with(calendar.clone()), Method::POST, "/api/events", Some(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        error_message(&bytes),
        "Required fields are missing or formatted incorrectly."
    );
    assert!(calendar.is_empty().await);
}

#[tokio::test]
async fn create_rejects_blank_summary_and_malformed_json() {
    let calendar = Arc::new(InMemoryCalendar::new());
    let blank = json!({ "summary": "  ", "start": MONDAY_START, "end": MONDAY_END });
    let (status, _, _) = call(app_with(calendar.clone()), Method::POST, "/api/events", Some(blank)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/events")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app_with(calendar.clone()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(
        error_message(&bytes),
        "Required fields are missing or formatted incorrectly."
    );
}

#[tokio::test]
async fn create_rejects_friday_and_past_events() {
    let calendar = Arc::new(InMemoryCalendar::new());
    let friday = json!({
        "summary": "Friday demo",
        "start": "2030-01-04T09:00:00Z",
        "end": "2030-01-04T10:00:00Z"
    });
    let past = json!({
        "summary": "Retro",
        "start": "2020-01-06T09:00:00Z",
        "end": "2020-01-06T10:00:00Z"
    });

    for body in [friday, past] {
        let (status, _, bytes) =
            call(app_with(calendar.clone()), Method::POST, "/api/events", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            error_message(&bytes),
            "Events cannot be created in the past or on weekends (Friday or Saturday)."
        );
    }
    assert!(calendar.is_empty().await);
}

#[tokio::test]
async fn get_unknown_event_is_not_found() {
    let (status, _, body) = call(
        app_with(Arc::default()),
        Method::GET,
        "/api/events/missing",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.is_empty());
}

#[tokio::test]
async fn get_returns_stored_event() {
    let calendar = Arc::new(InMemoryCalendar::with_events(vec![event(
        "abc",
        "Standup",
        MONDAY_START,
        MONDAY_END,
    )]));

    let (status, _, bytes) = call(app_with(calendar), Method::GET, "/api/events/abc", None).await;

    assert_eq!(status, StatusCode::OK);
    let dto: EventDto = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(dto.id.as_deref(), Some("abc"));
    assert_eq!(dto.summary.as_deref(), Some("Standup"));
}

#[tokio::test]
async fn delete_then_delete_again() {
    let calendar = Arc::new(InMemoryCalendar::with_events(vec![event(
        "abc",
        "Standup",
        MONDAY_START,
        MONDAY_END,
    )]));

    let (first, _, _) = call(app_with(calendar.clone()), Method::DELETE, "/api/events/abc", None).await;
    let (second, _, _) = call(app_with(calendar.clone()), Method::DELETE, "/api/events/abc", None).await;

    assert_eq!(first, StatusCode::NO_CONTENT);
    assert_eq!(second, StatusCode::NOT_FOUND);
    assert!(calendar.is_empty().await);
}

#[tokio::test]
async fn delete_without_id_is_bad_request() {
    let (status, _, bytes) = call(app_with(Arc::default()), Method::DELETE, "/api/events", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_message(&bytes), "eventId is required.");
}

#[tokio::test]
async fn list_returns_first_page_of_five() {
    let events = (0..12)
        .map(|i| {
            let start = format!("2030-01-07T{:02}:00:00Z", i + 6);
            let end = format!("2030-01-07T{:02}:30:00Z", i + 6);
            event(&format!("e{}", i), &format!("Meeting {}", i), &start, &end)
        })
        .collect();
    let calendar = Arc::new(InMemoryCalendar::with_events(events));

    let (status, _, bytes) = call(app_with(calendar), Method::GET, "/api/events", None).await;

    assert_eq!(status, StatusCode::OK);
    let page: PagedEvents = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(page.total_events, 12);
    assert_eq!(page.total_pages, 3);
    assert_eq!(page.current_page, 1);
    assert_eq!(page.events.len(), 5);
    assert_eq!(page.events[0].id.as_deref(), Some("e0"));
}

#[tokio::test]
async fn list_filters_by_window_and_summary() {
    let calendar = Arc::new(InMemoryCalendar::with_events(vec![
        event("a", "Team Sync", "2030-01-07T09:00:00Z", "2030-01-07T10:00:00Z"),
        event("b", "1:1", "2030-01-07T11:00:00Z", "2030-01-07T12:00:00Z"),
        event("c", "team lunch", "2030-01-08T12:00:00Z", "2030-01-08T13:00:00Z"),
        event("d", "Team Sync", "2030-01-09T09:00:00Z", "2030-01-09T10:00:00Z"),
    ]));

    let uri = "/api/events?startDate=2030-01-07&endDate=2030-01-08T23:59:59Z&searchQuery=TEAM";
    let (status, _, bytes) = call(app_with(calendar), Method::GET, uri, None).await;

    assert_eq!(status, StatusCode::OK);
    let page: PagedEvents = serde_json::from_slice(&bytes).unwrap();
    let ids: Vec<_> = page.events.iter().filter_map(|e| e.id.as_deref()).collect();
    assert_eq!(ids, vec!["a", "c"]);
    assert_eq!(page.total_pages, 1);
}

#[tokio::test]
async fn list_rejects_unparsable_dates() {
    let (status, _, _) = call(
        app_with(Arc::default()),
        Method::GET,
        "/api/events?startDate=tomorrow",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn search_without_matches_is_not_found() {
    let calendar = Arc::new(InMemoryCalendar::with_events(vec![event(
        "abc",
        "Standup",
        MONDAY_START,
        MONDAY_END,
    )]));

    let (status, _, _) = call(
        app_with(calendar),
        Method::GET,
        "/api/events/Search?summary=Retro",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn search_matches_summary_ignoring_case() {
    let calendar = Arc::new(InMemoryCalendar::with_events(vec![
        event("a", "Standup", MONDAY_START, MONDAY_END),
        event("b", "Standup notes", MONDAY_START, MONDAY_END),
    ]));

    for path in ["/api/events/Search?summary=STANDUP", "/api/events/search?summary=standup"] {
        let (status, _, bytes) = call(app_with(calendar.clone()), Method::GET, path, None).await;
        assert_eq!(status, StatusCode::OK);
        let found: Vec<EventDto> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id.as_deref(), Some("a"));
    }
}

#[tokio::test]
async fn update_overlays_provided_fields() {
    let calendar = Arc::new(InMemoryCalendar::with_events(vec![CalendarEvent {
        description: Some("Daily".to_string()),
        ..event("abc", "Standup", MONDAY_START, MONDAY_END)
    }]));

    let body = json!({ "summary": "Standup (moved)", "start": "2030-01-08T09:00:00Z", "end": "2030-01-08T09:30:00Z" });
    let (status, _, bytes) =
        call(app_with(calendar.clone()), Method::PUT, "/api/events/abc", Some(body)).await;

    assert_eq!(status, StatusCode::OK);
    let dto: EventDto = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(dto.summary.as_deref(), Some("Standup (moved)"));
    assert_eq!(dto.description.as_deref(), Some("Daily"));

    let stored = calendar.get("abc").await.unwrap().unwrap();
    assert_eq!(
        stored.start_instant(),
        Some(DateTime::parse_from_rfc3339("2030-01-08T09:00:00Z").unwrap())
    );
}

#[tokio::test]
async fn update_unknown_event_is_not_found() {
    let body = json!({ "summary": "Ghost" });
    let (status, _, _) = call(
        app_with(Arc::default()),
        Method::PUT,
        "/api/events/missing",
        Some(body),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_onto_a_saturday_is_rejected() {
    let calendar = Arc::new(InMemoryCalendar::with_events(vec![event(
        "abc",
        "Standup",
        MONDAY_START,
        MONDAY_END,
    )]));

    // Only the start moves; the stored end is used for the past check
    let body = json!({ "start": "2030-01-05T09:00:00Z" });
    let (status, _, bytes) =
        call(app_with(calendar.clone()), Method::PUT, "/api/events/abc", Some(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        error_message(&bytes),
        "Events cannot be created on weekends (Friday or Saturday) or in the past."
    );
    let stored = calendar.get("abc").await.unwrap().unwrap();
    assert_eq!(stored.summary.as_deref(), Some("Standup"));
    assert_eq!(
        stored.start_instant(),
        Some(DateTime::parse_from_rfc3339(MONDAY_START).unwrap())
    );
}

/// Backend whose every call fails with a remote fault
struct BrokenCalendar;

fn remote_fault<T>() -> AppResult<T> {
    Err(Error::Remote {
        status: 500,
        message: "secret detail".to_string(),
    })
}

#[async_trait]
impl CalendarService for BrokenCalendar {
    async fn create(&self, _event: &NewEventRequest) -> AppResult<CalendarEvent> {
        remote_fault()
    }

    async fn get(&self, _event_id: &str) -> AppResult<Option<CalendarEvent>> {
        remote_fault()
    }

    async fn get_all(&self) -> AppResult<Vec<CalendarEvent>> {
        remote_fault()
    }

    async fn search(&self, _criteria: &SearchCriteria) -> AppResult<Vec<CalendarEvent>> {
        remote_fault()
    }

    async fn delete(&self, _event_id: &str) -> AppResult<DeleteOutcome> {
        remote_fault()
    }

    async fn update(
        &self,
        _updated: &EventDto,
        _existing: CalendarEvent,
        _event_id: &str,
    ) -> AppResult<CalendarEvent> {
        remote_fault()
    }
}

#[tokio::test]
async fn backend_faults_become_generic_server_errors() {
    let app = router(AppState::new(Arc::new(BrokenCalendar)));
    let new_event = json!({ "summary": "Planning", "start": MONDAY_START, "end": MONDAY_END });
    let cases = [
        (Method::GET, "/api/events", None, "An error occurred while retrieving events."),
        (Method::POST, "/api/events", Some(new_event), "An error occurred while creating the event."),
        (Method::DELETE, "/api/events/abc", None, "An error occurred while deleting the event."),
        (Method::GET, "/api/events/abc", None, "An error occurred while retrieving the event."),
    ];

    for (method, uri, body, expected) in cases {
        let (status, _, bytes) = call(app.clone(), method, uri, body).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{}", uri);
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value, json!({ "error": expected }));
        assert!(!String::from_utf8_lossy(&bytes).contains("secret detail"));
    }
}
