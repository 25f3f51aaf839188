use crate::error::AppResult;
use crate::models::{EventDto, NewEventRequest, SearchCriteria};
use async_trait::async_trait;

// Export components
pub mod google_calendar;
pub mod memory_calendar;
pub mod notifications;

pub use google_calendar::{CalendarEvent, GoogleCalendarGateway};
pub use memory_calendar::InMemoryCalendar;

/// Result of a delete call that reached the calendar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

/// Operations the HTTP layer needs from a calendar backend
#[async_trait]
pub trait CalendarService: Send + Sync + 'static {
    /// Insert a new event and return the stored record
    async fn create(&self, event: &NewEventRequest) -> AppResult<CalendarEvent>;

    /// Fetch one event, `None` if it does not exist
    async fn get(&self, event_id: &str) -> AppResult<Option<CalendarEvent>>;

    /// Fetch every event of the calendar
    async fn get_all(&self) -> AppResult<Vec<CalendarEvent>>;

    /// Events inside the optional time window whose summary/description match
    async fn search(&self, criteria: &SearchCriteria) -> AppResult<Vec<CalendarEvent>>;

    /// Delete an event. An empty id is rejected before any remote call.
    async fn delete(&self, event_id: &str) -> AppResult<DeleteOutcome>;

    /// Overlay `updated` on `existing` and store the result
    async fn update(
        &self,
        updated: &EventDto,
        existing: CalendarEvent,
        event_id: &str,
    ) -> AppResult<CalendarEvent>;
}
