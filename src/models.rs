//! Request and response shapes of the REST API.
//!
//! These are deliberately flat and independent from the Google wire model in
//! [`crate::components::google_calendar::models`].

use crate::components::google_calendar::models::{CalendarEvent, EventAttachment};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Attachment as seen by API clients
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentDto {
    #[serde(default)]
    pub file_id: String,
    #[serde(default)]
    pub file_url: String,
}

/// Body of `POST /api/events`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEventRequest {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "flexible_instant")]
    pub start: Option<DateTime<FixedOffset>>,
    #[serde(default, deserialize_with = "flexible_instant")]
    pub end: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub attachments: Option<Vec<AttachmentDto>>,
}

/// Outbound event, also the body of `PUT /api/events/{eventId}`.
///
/// On update every field is optional: a missing field keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDto {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "flexible_instant")]
    pub start: Option<DateTime<FixedOffset>>,
    #[serde(default, deserialize_with = "flexible_instant")]
    pub end: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub attachments: Option<Vec<AttachmentDto>>,
}

impl From<&CalendarEvent> for EventDto {
    fn from(event: &CalendarEvent) -> Self {
        Self {
            id: Some(event.id.clone()),
            summary: event.summary.clone(),
            description: event.description.clone(),
            location: event.location.clone(),
            start: event.start_instant(),
            end: event.end_instant(),
            attachments: event
                .attachments
                .as_ref()
                .map(|attachments| attachments.iter().map(AttachmentDto::from).collect()),
        }
    }
}

impl From<&EventAttachment> for AttachmentDto {
    fn from(attachment: &EventAttachment) -> Self {
        Self {
            file_id: attachment.file_id.clone().unwrap_or_default(),
            file_url: attachment.file_url.clone(),
        }
    }
}

impl From<&AttachmentDto> for EventAttachment {
    fn from(attachment: &AttachmentDto) -> Self {
        Self {
            file_id: Some(attachment.file_id.clone()).filter(|id| !id.is_empty()),
            file_url: attachment.file_url.clone(),
            ..Default::default()
        }
    }
}

/// Envelope returned by `GET /api/events`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedEvents {
    pub total_events: usize,
    pub total_pages: usize,
    pub current_page: usize,
    pub events: Vec<EventDto>,
}

impl PagedEvents {
    /// Cut one page out of the full result set. Pages are 1-based.
    pub fn paginate(events: Vec<EventDto>, page: usize, page_size: usize) -> Self {
        let total_events = events.len();
        let total_pages = total_events.div_ceil(page_size);
        let events = events
            .into_iter()
            .skip(page.saturating_sub(1) * page_size)
            .take(page_size)
            .collect();

        Self {
            total_events,
            total_pages,
            current_page: page,
            events,
        }
    }
}

/// Filters of the search endpoint. All optional, all combined with AND.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchCriteria {
    pub summary: Option<String>,
    pub description: Option<String>,
    pub start: Option<DateTime<FixedOffset>>,
    pub end: Option<DateTime<FixedOffset>>,
}

/// Parse an instant given by a client.
///
/// Accepts RFC 3339, a bare `YYYY-MM-DDTHH:MM:SS` (taken as UTC) and a bare
/// date (midnight UTC).
pub fn parse_instant(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed);
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&naive).fixed_offset());
        }
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?).fixed_offset())
}

fn flexible_instant<'de, D>(deserializer: D) -> Result<Option<DateTime<FixedOffset>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(value) if value.trim().is_empty() => Ok(None),
        Some(value) => parse_instant(&value)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid date/time: {}", value))),
    }
}
