mod sendgrid;

pub use sendgrid::SendGridNotifier;

use crate::config::NotificationConfig;
use crate::error::AppResult;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use tracing::{info, warn};

/// Subject of the event-created mail
pub const EVENT_CREATED_SUBJECT: &str = "New Calendar Event Created";

/// An outbound HTML mail
#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

impl EmailMessage {
    /// Mail telling `to` that the event `summary` was created
    pub fn event_created(from: &str, to: &str, summary: &str) -> Self {
        let body = format!(
            "The {} Event Created Now you can check your Google Calendar to see the details",
            summary
        );
        Self {
            from: from.to_string(),
            to: to.to_string(),
            subject: EVENT_CREATED_SUBJECT.to_string(),
            html_body: format!("<html><body> {} </body></html>", body),
        }
    }
}

/// Outbound mail relay
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    /// Sender address used for every message
    fn sender(&self) -> &str;

    /// Deliver a message
    async fn send(&self, message: &EmailMessage) -> AppResult<()>;

    /// Tell an organizer their event exists
    async fn notify_event_created(&self, recipient: &str, summary: &str) -> AppResult<()> {
        let message = EmailMessage::event_created(self.sender(), recipient, summary);
        self.send(&message).await
    }
}

/// Build the notifier if the operator opted in and configured the relay
pub fn from_config(config: &NotificationConfig, client: Client) -> Option<Arc<dyn Notifier>> {
    if !config.notify_on_create {
        return None;
    }

    match (&config.sendgrid_api_key, &config.from_address) {
        (Some(api_key), Some(from)) => {
            info!("Event-created notifications enabled, sending as {}", from);
            Some(Arc::new(SendGridNotifier::new(client, api_key, from)))
        }
        _ => {
            warn!(
                "NOTIFY_ON_CREATE is set but SENDGRID_API_KEY or NOTIFY_FROM_ADDRESS is missing"
            );
            None
        }
    }
}
