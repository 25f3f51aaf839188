use crate::error::{config_error, env_error, AppResult};
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

/// Default settings file, read only if it exists
pub const DEFAULT_CONFIG_FILE: &str = "config/settings.toml";

/// Default Google Calendar REST endpoint
pub const DEFAULT_API_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";

/// Main configuration structure for the service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Address the HTTP server binds to
    pub bind_address: String,
    /// Port the HTTP server listens on
    pub port: u16,
    /// Google OAuth client secret file (as downloaded from the cloud console)
    pub client_secret_file: PathBuf,
    /// Local OAuth token cache
    pub token_file: PathBuf,
    /// Calendar every operation is scoped to
    pub calendar_id: String,
    /// Base URL of the Google Calendar REST API
    pub api_base_url: String,
    /// Loopback port for the OAuth redirect
    pub oauth_redirect_port: u16,
    /// Whether a missing token may trigger the browser authorization flow
    pub interactive_auth: bool,
    /// Outbound mail settings
    pub notifications: NotificationConfig,
}

/// Mail relay settings for the event-created notification
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// SendGrid API key
    pub sendgrid_api_key: Option<String>,
    /// Sender address
    pub from_address: Option<String>,
    /// Send a mail to the organizer after every successful create
    pub notify_on_create: bool,
}

/// Values from the optional TOML settings file
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    bind_address: Option<String>,
    port: Option<u16>,
    client_secret_file: Option<PathBuf>,
    token_file: Option<PathBuf>,
    calendar_id: Option<String>,
    api_base_url: Option<String>,
    oauth_redirect_port: Option<u16>,
    interactive_auth: Option<bool>,
    sendgrid_api_key: Option<String>,
    from_address: Option<String>,
    notify_on_create: Option<bool>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 5000,
            client_secret_file: PathBuf::from("google_auth/client_secret.json"),
            token_file: PathBuf::from("token.json"),
            calendar_id: "primary".to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            oauth_redirect_port: 8080,
            interactive_auth: true,
            notifications: NotificationConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from defaults, the settings file and the environment
    pub fn load() -> AppResult<Self> {
        // Load .env file if it exists
        dotenv().ok();

        let config_file =
            env::var("CONFIG_FILE").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        let mut config = Self::default();

        if let Some(file_config) = read_file_config(Path::new(&config_file))? {
            info!("Loaded settings from {}", config_file);
            config.apply_file(file_config);
        }

        config.apply_env()?;
        Ok(config)
    }

    /// Socket address for the HTTP listener
    pub fn socket_addr(&self) -> AppResult<SocketAddr> {
        format!("{}:{}", self.bind_address, self.port)
            .parse()
            .map_err(|_| config_error(&format!("Invalid bind address {}", self.bind_address)))
    }

    fn apply_file(&mut self, file: FileConfig) {
        if let Some(v) = file.bind_address {
            self.bind_address = v;
        }
        if let Some(v) = file.port {
            self.port = v;
        }
        if let Some(v) = file.client_secret_file {
            self.client_secret_file = v;
        }
        if let Some(v) = file.token_file {
            self.token_file = v;
        }
        if let Some(v) = file.calendar_id {
            self.calendar_id = v;
        }
        if let Some(v) = file.api_base_url {
            self.api_base_url = v;
        }
        if let Some(v) = file.oauth_redirect_port {
            self.oauth_redirect_port = v;
        }
        if let Some(v) = file.interactive_auth {
            self.interactive_auth = v;
        }
        if file.sendgrid_api_key.is_some() {
            self.notifications.sendgrid_api_key = file.sendgrid_api_key;
        }
        if file.from_address.is_some() {
            self.notifications.from_address = file.from_address;
        }
        if let Some(v) = file.notify_on_create {
            self.notifications.notify_on_create = v;
        }
    }

    fn apply_env(&mut self) -> AppResult<()> {
        if let Ok(v) = env::var("BIND_ADDRESS") {
            self.bind_address = v;
        }
        if let Some(v) = parse_env::<u16>("PORT")? {
            self.port = v;
        }
        if let Ok(v) = env::var("GOOGLE_CLIENT_SECRET_FILE") {
            self.client_secret_file = PathBuf::from(v);
        }
        if let Ok(v) = env::var("GOOGLE_TOKEN_FILE") {
            self.token_file = PathBuf::from(v);
        }
        if let Ok(v) = env::var("GOOGLE_CALENDAR_ID") {
            self.calendar_id = v;
        }
        if let Ok(v) = env::var("GOOGLE_API_BASE_URL") {
            self.api_base_url = v;
        }
        if let Some(v) = parse_env::<u16>("GOOGLE_OAUTH_REDIRECT_PORT")? {
            self.oauth_redirect_port = v;
        }
        if let Some(v) = parse_env::<bool>("GOOGLE_INTERACTIVE_AUTH")? {
            self.interactive_auth = v;
        }
        if let Ok(v) = env::var("SENDGRID_API_KEY") {
            self.notifications.sendgrid_api_key = Some(v);
        }
        if let Ok(v) = env::var("NOTIFY_FROM_ADDRESS") {
            self.notifications.from_address = Some(v);
        }
        if let Some(v) = parse_env::<bool>("NOTIFY_ON_CREATE")? {
            self.notifications.notify_on_create = v;
        }
        Ok(())
    }
}

fn read_file_config(path: &Path) -> AppResult<Option<FileConfig>> {
    if !path.exists() {
        debug!("No settings file at {:?}", path);
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    Ok(Some(toml::from_str(&content)?))
}

fn parse_env<T: FromStr>(var: &str) -> AppResult<Option<T>> {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| env_error(var)),
        Err(_) => Ok(None),
    }
}
