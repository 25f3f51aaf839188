use super::models::{CalendarEvent, EventAttachment, EventDateTime};
use crate::models::{EventDto, NewEventRequest, SearchCriteria};

/// Build the remote insert body for a new event
pub fn to_remote_event(request: &NewEventRequest) -> CalendarEvent {
    CalendarEvent {
        summary: request.summary.clone(),
        description: request.description.clone(),
        location: request.location.clone(),
        start: request.start.map(EventDateTime::at),
        end: request.end.map(EventDateTime::at),
        attachments: request
            .attachments
            .as_ref()
            .map(|attachments| attachments.iter().map(EventAttachment::from).collect()),
        ..Default::default()
    }
}

/// Lay the fields present in `updated` over `existing`.
///
/// Absent fields keep the stored value. The identifier never changes.
pub fn overlay_update(mut existing: CalendarEvent, updated: &EventDto) -> CalendarEvent {
    if let Some(summary) = &updated.summary {
        existing.summary = Some(summary.clone());
    }
    if let Some(description) = &updated.description {
        existing.description = Some(description.clone());
    }
    if let Some(location) = &updated.location {
        existing.location = Some(location.clone());
    }
    if let Some(start) = updated.start {
        existing.start = Some(retime(existing.start.take(), start));
    }
    if let Some(end) = updated.end {
        existing.end = Some(retime(existing.end.take(), end));
    }
    // Google refuses a body that mixes `date` and `dateTime` bounds
    if updated.start.is_some() || updated.end.is_some() {
        existing.start = existing.start.map(timed);
        existing.end = existing.end.map(timed);
    }
    if let Some(attachments) = &updated.attachments {
        existing.attachments = Some(attachments.iter().map(EventAttachment::from).collect());
    }
    existing
}

// Keep the stored time zone, drop an all-day date
fn retime(
    current: Option<EventDateTime>,
    date_time: chrono::DateTime<chrono::FixedOffset>,
) -> EventDateTime {
    EventDateTime {
        date_time: Some(date_time),
        date: None,
        time_zone: current.and_then(|c| c.time_zone),
    }
}

// Turn an all-day bound into a timed one at its instant
fn timed(bound: EventDateTime) -> EventDateTime {
    match (bound.date_time, bound.instant()) {
        (None, Some(instant)) => EventDateTime {
            date_time: Some(instant),
            date: None,
            time_zone: bound.time_zone,
        },
        _ => bound,
    }
}

/// Local part of a search: case-insensitive exact match on summary and description
pub fn matches_text(event: &CalendarEvent, criteria: &SearchCriteria) -> bool {
    field_matches(event.summary.as_deref(), criteria.summary.as_deref())
        && field_matches(event.description.as_deref(), criteria.description.as_deref())
}

fn field_matches(value: Option<&str>, wanted: Option<&str>) -> bool {
    match wanted.filter(|w| !w.is_empty()) {
        None => true,
        Some(wanted) => value.is_some_and(|v| v.to_lowercase() == wanted.to_lowercase()),
    }
}

/// Time-window part of a search, with the Calendar API's semantics:
/// the event must end after `start` and begin before `end`.
pub fn overlaps_window(event: &CalendarEvent, criteria: &SearchCriteria) -> bool {
    let ends_after = match criteria.start {
        Some(window_start) => event.end_instant().is_some_and(|end| end > window_start),
        None => true,
    };
    let starts_before = match criteria.end {
        Some(window_end) => event.start_instant().is_some_and(|start| start < window_end),
        None => true,
    };
    ends_after && starts_before
}
