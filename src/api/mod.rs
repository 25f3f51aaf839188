//! REST surface over a [`CalendarService`].

pub mod error;
pub mod handlers;
pub mod rules;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::components::notifications::Notifier;
use crate::components::CalendarService;
use handlers::{
    create_event, delete_event, delete_without_id, get_event, health_handler, list_events,
    search_events, update_event,
};

/// Shared state of every request
#[derive(Clone)]
pub struct AppState {
    /// Calendar backend
    pub calendar: Arc<dyn CalendarService>,
    /// Mail relay for event-created messages, if enabled
    pub notifier: Option<Arc<dyn Notifier>>,
}

impl AppState {
    pub fn new(calendar: Arc<dyn CalendarService>) -> Self {
        Self {
            calendar,
            notifier: None,
        }
    }

    pub fn with_notifier(mut self, notifier: Option<Arc<dyn Notifier>>) -> Self {
        self.notifier = notifier;
        self
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route(
            "/api/events",
            get(list_events).post(create_event).delete(delete_without_id),
        )
        .route("/api/events/Search", get(search_events))
        .route("/api/events/search", get(search_events))
        .route(
            "/api/events/{event_id}",
            get(get_event).put(update_event).delete(delete_event),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
