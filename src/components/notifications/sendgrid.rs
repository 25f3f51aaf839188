use super::{EmailMessage, Notifier};
use crate::error::{notification_error, AppResult};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::info;

/// SendGrid v3 endpoint
pub const SENDGRID_API_URL: &str = "https://api.sendgrid.com/v3/mail/send";

/// Sends mail through SendGrid's HTTP API
pub struct SendGridNotifier {
    client: Client,
    api_key: String,
    from: String,
    endpoint: String,
}

impl SendGridNotifier {
    pub fn new(client: Client, api_key: &str, from: &str) -> Self {
        Self {
            client,
            api_key: api_key.to_string(),
            from: from.to_string(),
            endpoint: SENDGRID_API_URL.to_string(),
        }
    }

    /// Point at another endpoint (a local relay or a test server)
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }
}

#[async_trait]
impl Notifier for SendGridNotifier {
    fn sender(&self) -> &str {
        &self.from
    }

    async fn send(&self, message: &EmailMessage) -> AppResult<()> {
        let payload = json!({
            "personalizations": [{ "to": [{ "email": message.to }] }],
            "from": { "email": message.from },
            "subject": message.subject,
            "content": [{ "type": "text/html", "value": message.html_body }],
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| notification_error(&format!("Failed to reach mail relay: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error response".to_string());
            return Err(notification_error(&format!(
                "Mail relay rejected message: HTTP {} - {}",
                status, error_body
            )));
        }

        info!("Sent '{}' to {}", message.subject, message.to);
        Ok(())
    }
}

impl std::fmt::Debug for SendGridNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SendGridNotifier")
            .field("from", &self.from)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}
