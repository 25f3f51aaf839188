use super::oauth::{authorization_url, CallbackServer, GOOGLE_AUTH_URL};
use crate::config::Config;
use crate::error::{credential_error, other_error, AppResult};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Google's token endpoint
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Full read/write access to calendars
pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";

/// Drive access, requested alongside the calendar for attachments
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

/// Scopes requested during authorization
pub const SCOPES: [&str; 2] = [CALENDAR_SCOPE, DRIVE_SCOPE];

/// OAuth client registration read from the client secret file
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClientSecret {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    GOOGLE_AUTH_URL.to_string()
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URL.to_string()
}

/// Layout of the JSON file downloaded from the Google cloud console
#[derive(Debug, Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientSecret>,
    web: Option<ClientSecret>,
}

impl ClientSecret {
    /// Load the client secret file
    pub fn load(path: &Path) -> AppResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            credential_error(&format!("Failed to read client secret file {:?}: {}", path, e))
        })?;
        Self::from_json(&content)
    }

    /// Parse the `installed` (desktop) or `web` section of a client secret file
    pub fn from_json(content: &str) -> AppResult<Self> {
        let file: ClientSecretFile = serde_json::from_str(content)
            .map_err(|e| credential_error(&format!("Invalid client secret file: {}", e)))?;

        file.installed
            .or(file.web)
            .ok_or_else(|| credential_error("Client secret file has no 'installed' or 'web' section"))
    }
}

/// Cached OAuth credentials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl TokenInfo {
    /// Whether the access token has run out. Tokens without expiry never do.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|expires_at| Utc::now() >= expires_at)
    }

    fn from_response(response: TokenResponse, previous_refresh_token: Option<String>) -> Self {
        Self {
            access_token: response.access_token,
            // Refresh responses usually omit the refresh token
            refresh_token: response.refresh_token.or(previous_refresh_token),
            expires_at: response
                .expires_in
                .map(|secs| Utc::now() + Duration::seconds(secs)),
            scope: response.scope,
            token_type: response.token_type,
        }
    }
}

/// Body of a successful token endpoint response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
}

/// Token cache on local disk
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the cached token, `None` if there is no cache yet
    pub async fn load(&self) -> AppResult<Option<TokenInfo>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No token cache at {:?}", self.path);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let token = serde_json::from_str(&content)
            .map_err(|e| credential_error(&format!("Failed to parse token cache: {}", e)))?;
        Ok(Some(token))
    }

    /// Write the token cache, creating parent directories as needed
    pub async fn save(&self, token: &TokenInfo) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(&self.path, serde_json::to_string_pretty(token)?).await?;
        debug!("Token cache written to {:?}", self.path);
        Ok(())
    }
}

/// Anything that can hand out a bearer token for the Calendar API
#[async_trait]
pub trait AccessTokenSource: Send + Sync + 'static {
    async fn access_token(&self) -> AppResult<String>;
}

/// Fixed bearer token, for tests and pre-provisioned deployments
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

#[async_trait]
impl AccessTokenSource for StaticToken {
    async fn access_token(&self) -> AppResult<String> {
        Ok(self.0.clone())
    }
}

/// Hands out access tokens, refreshing or authorizing as needed.
///
/// One instance is shared by the whole process. The write lock is held while
/// refreshing or authorizing, so concurrent requests wait for a single flow.
pub struct TokenManager {
    secret: ClientSecret,
    store: TokenStore,
    client: Client,
    cached: RwLock<Option<TokenInfo>>,
    interactive: bool,
    redirect_port: u16,
}

impl TokenManager {
    /// Create a token manager from the service configuration
    pub fn new(config: &Config, client: Client) -> AppResult<Self> {
        let secret = ClientSecret::load(&config.client_secret_file)?;
        Ok(Self::with_secret(secret, TokenStore::new(&config.token_file), client)
            .interactive(config.interactive_auth, config.oauth_redirect_port))
    }

    /// Create a non-interactive token manager from an already loaded secret
    pub fn with_secret(secret: ClientSecret, store: TokenStore, client: Client) -> Self {
        Self {
            secret,
            store,
            client,
            cached: RwLock::new(None),
            interactive: false,
            redirect_port: 8080,
        }
    }

    /// Allow the browser flow when no token is cached
    pub fn interactive(mut self, enabled: bool, redirect_port: u16) -> Self {
        self.interactive = enabled;
        self.redirect_port = redirect_port;
        self
    }

    /// Return a valid token, refreshing or authorizing first if needed
    pub async fn acquire(&self) -> AppResult<TokenInfo> {
        {
            let cached = self.cached.read().await;
            if let Some(token) = cached.as_ref().filter(|token| !token.is_expired()) {
                return Ok(token.clone());
            }
        }

        let mut cached = self.cached.write().await;
        let current = match cached.take() {
            Some(token) => Some(token),
            None => self.store.load().await?,
        };

        let token = match current {
            Some(token) if !token.is_expired() => token,
            Some(token) => {
                info!("Access token expired, refreshing");
                let refreshed = self.refresh(&token).await?;
                self.store.save(&refreshed).await?;
                refreshed
            }
            None if self.interactive => {
                let token = self.authorize().await?;
                self.store.save(&token).await?;
                token
            }
            None => {
                return Err(credential_error(
                    "No cached token found and interactive authorization is disabled",
                ))
            }
        };

        *cached = Some(token.clone());
        Ok(token)
    }

    /// Run the browser authorization flow and persist the result
    pub async fn authorize_and_store(&self) -> AppResult<TokenInfo> {
        let token = self.authorize().await?;
        self.store.save(&token).await?;
        *self.cached.write().await = Some(token.clone());
        info!("Token saved to {:?}", self.store.path());
        Ok(token)
    }

    /// Exchange a refresh token for a new access token
    async fn refresh(&self, token: &TokenInfo) -> AppResult<TokenInfo> {
        let refresh_token = token
            .refresh_token
            .clone()
            .ok_or_else(|| credential_error("Token refresh failed: no refresh token cached"))?;

        let params = [
            ("client_id", self.secret.client_id.as_str()),
            ("client_secret", self.secret.client_secret.as_str()),
            ("refresh_token", refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let response = self.request_token(&params).await?;
        info!("Access token refreshed");
        Ok(TokenInfo::from_response(response, Some(refresh_token)))
    }

    /// Trade an authorization code for tokens
    pub async fn exchange_code(&self, code: &str, redirect_uri: &str) -> AppResult<TokenInfo> {
        let params = [
            ("client_id", self.secret.client_id.as_str()),
            ("client_secret", self.secret.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("grant_type", "authorization_code"),
        ];

        let response = self.request_token(&params).await?;
        Ok(TokenInfo::from_response(response, None))
    }

    async fn request_token(&self, params: &[(&str, &str)]) -> AppResult<TokenResponse> {
        let response = self
            .client
            .post(&self.secret.token_uri)
            .form(params)
            .send()
            .await
            .map_err(|e| credential_error(&format!("Token request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error response".to_string());
            return Err(credential_error(&format!(
                "Token request failed: HTTP {} - {}",
                status, error_body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| credential_error(&format!("Failed to parse token response: {}", e)))
    }

    async fn authorize(&self) -> AppResult<TokenInfo> {
        let server = CallbackServer::bind(self.redirect_port)?;
        let redirect_uri = server.redirect_uri();
        let state = uuid::Uuid::new_v4().to_string();
        let url = authorization_url(
            &self.secret.auth_uri,
            &self.secret.client_id,
            &redirect_uri,
            &SCOPES,
            &state,
        )?;

        info!("Opening browser for Google Calendar authorization...");
        if let Err(e) = webbrowser::open(url.as_str()) {
            warn!("Failed to open browser: {}", e);
        }
        info!("If the browser did not open, visit: {}", url);

        let code = tokio::task::spawn_blocking(move || server.wait_for_code(&state))
            .await
            .map_err(|e| other_error(&format!("Authorization task failed: {}", e)))??;

        info!("Received authorization code, exchanging for tokens");
        self.exchange_code(&code, &redirect_uri).await
    }
}

#[async_trait]
impl AccessTokenSource for TokenManager {
    async fn access_token(&self) -> AppResult<String> {
        Ok(self.acquire().await?.access_token)
    }
}
