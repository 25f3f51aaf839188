use super::convert::{matches_text, overlay_update, to_remote_event};
use super::models::{CalendarEvent, EventList, GoogleErrorEnvelope};
use super::token::AccessTokenSource;
use crate::components::{CalendarService, DeleteOutcome};
use crate::error::{validation_error, AppResult, Error};
use crate::models::{EventDto, NewEventRequest, SearchCriteria};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use std::sync::Arc;
use tracing::{debug, info};

/// Calendar backend talking to the Google Calendar REST API.
///
/// Every call is scoped to one calendar (normally `primary`) and authorizes
/// with a token from the shared [`AccessTokenSource`].
#[derive(Clone)]
pub struct GoogleCalendarGateway {
    client: Client,
    base_url: String,
    calendar_id: String,
    tokens: Arc<dyn AccessTokenSource>,
}

impl GoogleCalendarGateway {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        calendar_id: impl Into<String>,
        tokens: Arc<dyn AccessTokenSource>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            calendar_id: calendar_id.into(),
            tokens,
        }
    }

    fn events_url(&self) -> String {
        format!(
            "{}/calendars/{}/events",
            self.base_url,
            urlencoding::encode(&self.calendar_id)
        )
    }

    fn event_url(&self, event_id: &str) -> String {
        format!("{}/{}", self.events_url(), urlencoding::encode(event_id))
    }

    async fn send(&self, request: RequestBuilder) -> AppResult<Response> {
        let token = self.tokens.access_token().await?;
        let response = request.bearer_auth(token).send().await?;
        check_status(response).await
    }

    /// One page of the events list, optionally bounded in time
    async fn list(&self, criteria: Option<&SearchCriteria>) -> AppResult<Vec<CalendarEvent>> {
        let mut request = self.client.get(self.events_url());
        if let Some(criteria) = criteria {
            if let Some(start) = criteria.start {
                request = request.query(&[("timeMin", start.to_rfc3339())]);
            }
            if let Some(end) = criteria.end {
                request = request.query(&[("timeMax", end.to_rfc3339())]);
            }
        }

        let list: EventList = self.send(request).await?.json().await?;
        debug!(
            "Fetched {} events from calendar {}",
            list.items.len(),
            self.calendar_id
        );
        if list.next_page_token.is_some() {
            debug!("Calendar {} has further pages, not fetched", self.calendar_id);
        }
        Ok(list.items)
    }
}

/// Turn a non-success response into a structured remote error
async fn check_status(response: Response) -> AppResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Could not read error response".to_string());
    let message = serde_json::from_str::<GoogleErrorEnvelope>(&body)
        .map(|envelope| envelope.error.message)
        .unwrap_or(body);

    Err(Error::Remote {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl CalendarService for GoogleCalendarGateway {
    async fn create(&self, event: &NewEventRequest) -> AppResult<CalendarEvent> {
        let body = to_remote_event(event);
        let request = self
            .client
            .post(self.events_url())
            .query(&[("supportsAttachments", "true")])
            .json(&body);

        let created: CalendarEvent = self.send(request).await?.json().await?;
        info!("Created event {} in calendar {}", created.id, self.calendar_id);
        Ok(created)
    }

    async fn get(&self, event_id: &str) -> AppResult<Option<CalendarEvent>> {
        if event_id.trim().is_empty() {
            return Ok(None);
        }

        match self.send(self.client.get(self.event_url(event_id))).await {
            Ok(response) => {
                let event: CalendarEvent = response.json().await?;
                // Deleted events stay fetchable by id with a cancelled status
                Ok(Some(event).filter(|event| !event.is_cancelled()))
            }
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Single page of the list call, further pages are not followed
    async fn get_all(&self) -> AppResult<Vec<CalendarEvent>> {
        self.list(None).await
    }

    async fn search(&self, criteria: &SearchCriteria) -> AppResult<Vec<CalendarEvent>> {
        let events = self.list(Some(criteria)).await?;
        Ok(events
            .into_iter()
            .filter(|event| matches_text(event, criteria))
            .collect())
    }

    async fn delete(&self, event_id: &str) -> AppResult<DeleteOutcome> {
        if event_id.trim().is_empty() {
            return Err(validation_error("eventId is required."));
        }

        match self.send(self.client.delete(self.event_url(event_id))).await {
            Ok(_) => {
                info!("Deleted event {}", event_id);
                Ok(DeleteOutcome::Deleted)
            }
            Err(e) if e.is_not_found() => Ok(DeleteOutcome::NotFound),
            Err(e) => Err(e),
        }
    }

    async fn update(
        &self,
        updated: &EventDto,
        existing: CalendarEvent,
        event_id: &str,
    ) -> AppResult<CalendarEvent> {
        let merged = overlay_update(existing, updated);
        let request = self
            .client
            .put(self.event_url(event_id))
            .query(&[("supportsAttachments", "true")])
            .json(&merged);

        let stored: CalendarEvent = self.send(request).await?.json().await?;
        info!("Updated event {}", event_id);
        Ok(stored)
    }
}

impl std::fmt::Debug for GoogleCalendarGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleCalendarGateway")
            .field("base_url", &self.base_url)
            .field("calendar_id", &self.calendar_id)
            .finish()
    }
}
