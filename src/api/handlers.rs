use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, FixedOffset, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::error::ApiError;
use super::rules::violates_schedule_rules;
use super::AppState;
use crate::components::notifications::Notifier;
use crate::components::{CalendarEvent, DeleteOutcome};
use crate::error::Error;
use crate::models::{parse_instant, EventDto, NewEventRequest, PagedEvents, SearchCriteria};

pub const REQUIRED_FIELDS_MESSAGE: &str = "Required fields are missing or formatted incorrectly.";
pub const CREATE_SCHEDULE_MESSAGE: &str =
    "Events cannot be created in the past or on weekends (Friday or Saturday).";
pub const UPDATE_SCHEDULE_MESSAGE: &str =
    "Events cannot be created on weekends (Friday or Saturday) or in the past.";
pub const EVENT_ID_REQUIRED_MESSAGE: &str = "eventId is required.";

/// Events per page of `GET /api/events`
pub const PAGE_SIZE: usize = 5;
/// The list endpoint always returns its first page
pub const CURRENT_PAGE: usize = 1;

/// Query string of `GET /api/events`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub search_query: Option<String>,
}

/// Query string of `GET /api/events/Search`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub summary: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Handler for health check
pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// `POST /api/events`
pub async fn create_event(
    State(state): State<AppState>,
    body: Result<Json<NewEventRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body.map_err(|rejection| {
        warn!("Rejected event body: {}", rejection.body_text());
        ApiError::bad_request(REQUIRED_FIELDS_MESSAGE)
    })?;

    let summary_present = request
        .summary
        .as_deref()
        .is_some_and(|summary| !summary.trim().is_empty());
    let (Some(start), Some(end)) = (request.start, request.end) else {
        return Err(ApiError::bad_request(REQUIRED_FIELDS_MESSAGE));
    };
    if !summary_present {
        return Err(ApiError::bad_request(REQUIRED_FIELDS_MESSAGE));
    }

    if violates_schedule_rules(start, end, Utc::now()) {
        return Err(ApiError::bad_request(CREATE_SCHEDULE_MESSAGE));
    }

    let created = state
        .calendar
        .create(&request)
        .await
        .map_err(|e| ApiError::internal("creating the event", &e))?;
    info!("Created event {}", created.id);

    if let Some(notifier) = &state.notifier {
        spawn_created_notification(Arc::clone(notifier), &created);
    }

    let location = format!("/api/events/{}", urlencoding::encode(&created.id));
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(EventDto::from(&created)),
    ))
}

// Mail the organizer without holding up the response
fn spawn_created_notification(notifier: Arc<dyn Notifier>, created: &CalendarEvent) {
    let Some(recipient) = created
        .organizer
        .as_ref()
        .and_then(|organizer| organizer.email.clone())
    else {
        warn!("Event {} has no organizer email, skipping notification", created.id);
        return;
    };
    let summary = created.summary.clone().unwrap_or_default();

    tokio::spawn(async move {
        if let Err(e) = notifier.notify_event_created(&recipient, &summary).await {
            error!("Failed to send event-created notification: {:?}", e);
        }
    });
}

/// `GET /api/events/{eventId}`
pub async fn get_event(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<Json<EventDto>, ApiError> {
    let event = state
        .calendar
        .get(&event_id)
        .await
        .map_err(|e| ApiError::internal("retrieving the event", &e))?
        .ok_or_else(ApiError::not_found)?;

    Ok(Json(EventDto::from(&event)))
}

/// `DELETE /api/events/{eventId}`
pub async fn delete_event(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if event_id.trim().is_empty() {
        return Err(ApiError::bad_request(EVENT_ID_REQUIRED_MESSAGE));
    }

    match state.calendar.delete(&event_id).await {
        Ok(DeleteOutcome::Deleted) => {
            info!("Deleted event {}", event_id);
            Ok(StatusCode::NO_CONTENT)
        }
        Ok(DeleteOutcome::NotFound) => Err(ApiError::not_found()),
        Err(Error::Validation(_)) => {
            Err(ApiError::bad_request(EVENT_ID_REQUIRED_MESSAGE))
        }
        Err(e) => Err(ApiError::internal("deleting the event", &e)),
    }
}

/// `DELETE /api/events` without an identifier
pub async fn delete_without_id() -> ApiError {
    ApiError::bad_request(EVENT_ID_REQUIRED_MESSAGE)
}

/// `GET /api/events`: first page of the filtered calendar
pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<PagedEvents>, ApiError> {
    let start_date = query_instant(query.start_date.as_deref())?;
    let end_date = query_instant(query.end_date.as_deref())?;
    let needle = query
        .search_query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_lowercase);

    let events = state
        .calendar
        .get_all()
        .await
        .map_err(|e| ApiError::internal("retrieving events", &e))?;

    let filtered: Vec<EventDto> = events
        .iter()
        .map(EventDto::from)
        .filter(|event| match start_date {
            Some(from) => event.start.is_some_and(|start| start >= from),
            None => true,
        })
        .filter(|event| match end_date {
            Some(until) => event.end.is_some_and(|end| end <= until),
            None => true,
        })
        .filter(|event| match &needle {
            Some(needle) => event
                .summary
                .as_deref()
                .is_some_and(|summary| summary.to_lowercase().contains(needle.as_str())),
            None => true,
        })
        .collect();

    Ok(Json(PagedEvents::paginate(filtered, CURRENT_PAGE, PAGE_SIZE)))
}

/// `GET /api/events/Search`
pub async fn search_events(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<EventDto>>, ApiError> {
    let criteria = SearchCriteria {
        summary: query.summary,
        description: query.description,
        start: query_instant(query.start_date.as_deref())?,
        end: query_instant(query.end_date.as_deref())?,
    };

    let events = state
        .calendar
        .search(&criteria)
        .await
        .map_err(|e| ApiError::internal("searching for events", &e))?;

    if events.is_empty() {
        return Err(ApiError::not_found());
    }

    Ok(Json(events.iter().map(EventDto::from).collect()))
}

/// `PUT /api/events/{eventId}`
pub async fn update_event(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    body: Result<Json<EventDto>, JsonRejection>,
) -> Result<Json<EventDto>, ApiError> {
    let Json(updated) = body.map_err(|rejection| {
        warn!("Rejected event body: {}", rejection.body_text());
        ApiError::bad_request(REQUIRED_FIELDS_MESSAGE)
    })?;

    let existing = state
        .calendar
        .get(&event_id)
        .await
        .map_err(|e| ApiError::internal("updating the event", &e))?
        .ok_or_else(ApiError::not_found)?;

    // Rules apply to the event as it will be stored
    let start = updated.start.or(existing.start_instant());
    let end = updated.end.or(existing.end_instant());
    let (Some(start), Some(end)) = (start, end) else {
        return Err(ApiError::bad_request(REQUIRED_FIELDS_MESSAGE));
    };
    if violates_schedule_rules(start, end, Utc::now()) {
        return Err(ApiError::bad_request(UPDATE_SCHEDULE_MESSAGE));
    }

    match state.calendar.update(&updated, existing, &event_id).await {
        Ok(stored) => {
            info!("Updated event {}", event_id);
            Ok(Json(EventDto::from(&stored)))
        }
        Err(e) if e.is_not_found() => Err(ApiError::not_found()),
        Err(e) => Err(ApiError::internal("updating the event", &e)),
    }
}

fn query_instant(raw: Option<&str>) -> Result<Option<DateTime<FixedOffset>>, ApiError> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(None),
        Some(value) => parse_instant(value).map(Some).ok_or_else(|| {
            ApiError::bad_request(&format!("Invalid date/time in query: {}", value))
        }),
    }
}
