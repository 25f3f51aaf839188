use super::google_calendar::convert::{matches_text, overlaps_window, overlay_update, to_remote_event};
use super::{CalendarEvent, CalendarService, DeleteOutcome};
use crate::error::{validation_error, AppResult, Error};
use crate::models::{EventDto, NewEventRequest, SearchCriteria};
use async_trait::async_trait;
use tokio::sync::RwLock;

/// Calendar kept in process memory.
///
/// Behaves like the Google gateway (same search and overlay rules) and backs
/// the HTTP tests.
#[derive(Debug, Default)]
pub struct InMemoryCalendar {
    events: RwLock<Vec<CalendarEvent>>,
}

impl InMemoryCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with the given events already stored
    pub fn with_events(events: Vec<CalendarEvent>) -> Self {
        Self {
            events: RwLock::new(events),
        }
    }

    /// Number of stored events
    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }
}

#[async_trait]
impl CalendarService for InMemoryCalendar {
    async fn create(&self, event: &NewEventRequest) -> AppResult<CalendarEvent> {
        let mut created = to_remote_event(event);
        created.id = uuid::Uuid::new_v4().simple().to_string();
        created.status = Some("confirmed".to_string());

        self.events.write().await.push(created.clone());
        Ok(created)
    }

    async fn get(&self, event_id: &str) -> AppResult<Option<CalendarEvent>> {
        let events = self.events.read().await;
        Ok(events.iter().find(|event| event.id == event_id).cloned())
    }

    async fn get_all(&self) -> AppResult<Vec<CalendarEvent>> {
        Ok(self.events.read().await.clone())
    }

    async fn search(&self, criteria: &SearchCriteria) -> AppResult<Vec<CalendarEvent>> {
        let events = self.events.read().await;
        Ok(events
            .iter()
            .filter(|event| overlaps_window(event, criteria) && matches_text(event, criteria))
            .cloned()
            .collect())
    }

    async fn delete(&self, event_id: &str) -> AppResult<DeleteOutcome> {
        if event_id.trim().is_empty() {
            return Err(validation_error("eventId is required."));
        }

        let mut events = self.events.write().await;
        let before = events.len();
        events.retain(|event| event.id != event_id);

        Ok(if events.len() < before {
            DeleteOutcome::Deleted
        } else {
            DeleteOutcome::NotFound
        })
    }

    async fn update(
        &self,
        updated: &EventDto,
        existing: CalendarEvent,
        event_id: &str,
    ) -> AppResult<CalendarEvent> {
        let mut events = self.events.write().await;
        let slot = events
            .iter_mut()
            .find(|event| event.id == event_id)
            .ok_or_else(|| Error::NotFound(format!("event {}", event_id)))?;

        let merged = overlay_update(existing, updated);
        *slot = merged.clone();
        Ok(merged)
    }
}
