use crate::error::{credential_error, AppResult};
use std::time::{Duration, Instant};
use tracing::{debug, info};
use url::Url;

/// Google's consent page
pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// How long the loopback server waits for the browser to come back
const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

/// Build the consent URL the user has to open
pub fn authorization_url(
    auth_uri: &str,
    client_id: &str,
    redirect_uri: &str,
    scopes: &[&str],
    state: &str,
) -> AppResult<Url> {
    let mut url = Url::parse(auth_uri)
        .map_err(|e| credential_error(&format!("Invalid authorization URL: {}", e)))?;

    url.query_pairs_mut()
        .append_pair("client_id", client_id)
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("response_type", "code")
        .append_pair("access_type", "offline")
        .append_pair("prompt", "consent")
        .append_pair("scope", &scopes.join(" "))
        .append_pair("state", state);

    Ok(url)
}

/// What the browser brought back to the loopback server
#[derive(Debug, PartialEq)]
pub enum CallbackOutcome {
    /// Authorization code, state already verified
    Code(String),
    /// Not the redirect (favicon and friends), keep waiting
    Ignored,
}

/// Inspect the request target of a redirect such as `/?code=..&state=..`
pub fn parse_callback(request_target: &str, expected_state: &str) -> AppResult<CallbackOutcome> {
    let url = Url::parse(&format!("http://localhost{}", request_target))
        .map_err(|e| credential_error(&format!("Malformed callback: {}", e)))?;

    let mut code = None;
    let mut state = None;
    let mut error = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Err(credential_error(&format!("Authorization denied: {}", error)));
    }

    let Some(code) = code else {
        return Ok(CallbackOutcome::Ignored);
    };

    if state.as_deref() != Some(expected_state) {
        return Err(credential_error("OAuth state mismatch"));
    }

    Ok(CallbackOutcome::Code(code))
}

/// Loopback HTTP server receiving the OAuth redirect
pub struct CallbackServer {
    server: tiny_http::Server,
    port: u16,
}

impl CallbackServer {
    /// Bind the loopback server. Done before the browser is opened.
    pub fn bind(port: u16) -> AppResult<Self> {
        let server = tiny_http::Server::http(("127.0.0.1", port)).map_err(|e| {
            credential_error(&format!("Failed to start callback server on port {}: {}", port, e))
        })?;
        Ok(Self { server, port })
    }

    /// Redirect URI registered with Google for this server
    pub fn redirect_uri(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Block until the redirect arrives and return the authorization code
    pub fn wait_for_code(self, expected_state: &str) -> AppResult<String> {
        info!("Waiting for authorization callback on port {}", self.port);
        let deadline = Instant::now() + CALLBACK_TIMEOUT;

        loop {
            let request = remaining_until(deadline, Instant::now())
                .map(|wait| self.server.recv_timeout(wait))
                .transpose()?
                .flatten()
                .ok_or_else(|| credential_error("Timed out waiting for the authorization callback"))?;

            let target = request.url().to_string();
            match parse_callback(&target, expected_state) {
                Ok(CallbackOutcome::Code(code)) => {
                    let response = tiny_http::Response::from_string(
                        "Authorization successful! You can close this window.",
                    );
                    request.respond(response)?;
                    return Ok(code);
                }
                Ok(CallbackOutcome::Ignored) => {
                    debug!("Ignoring request to {}", target);
                    request.respond(tiny_http::Response::empty(404))?;
                }
                Err(e) => {
                    let response = tiny_http::Response::from_string(format!(
                        "Authorization failed: {}",
                        e
                    ))
                    .with_status_code(400);
                    request.respond(response)?;
                    return Err(e);
                }
            }
        }
    }
}

// Time left before `deadline`, `None` once it has passed
fn remaining_until(deadline: Instant, now: Instant) -> Option<Duration> {
    deadline
        .checked_duration_since(now)
        .filter(|left| !left.is_zero())
}
