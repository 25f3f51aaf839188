use miette::Diagnostic;
use thiserror::Error;

/// Main error type for the application
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("Validation error: {0}")]
    #[diagnostic(code(gcal_events::validation))]
    Validation(String),

    #[error("Not found: {0}")]
    #[diagnostic(code(gcal_events::not_found))]
    NotFound(String),

    #[error("Credential error: {0}")]
    #[diagnostic(
        code(gcal_events::credential),
        help("Run `get_calendar_token` to authorize the application again")
    )]
    Credential(String),

    #[error("Google Calendar API error (HTTP {status}): {message}")]
    #[diagnostic(code(gcal_events::google_calendar))]
    Remote { status: u16, message: String },

    #[error("Google Calendar request failed: {0}")]
    #[diagnostic(code(gcal_events::transport))]
    Transport(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    #[diagnostic(code(gcal_events::config))]
    Config(String),

    #[error("Notification error: {0}")]
    #[diagnostic(code(gcal_events::notification))]
    Notification(String),

    #[error(transparent)]
    #[diagnostic(code(gcal_events::io))]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(gcal_events::serialization))]
    Serialization(String),

    #[error("Other error: {0}")]
    #[diagnostic(code(gcal_events::other))]
    Other(String),
}

impl Error {
    /// True when the remote service reported the resource as missing or gone
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound(_) => true,
            Error::Remote { status, .. } => *status == 404 || *status == 410,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Type alias for Result with our Error type
pub type AppResult<T> = Result<T, Error>;

/// Helper to create environment errors
pub fn env_error(var: &str) -> Error {
    Error::Config(format!("Invalid value for environment variable: {}", var))
}

/// Helper to create configuration errors
pub fn config_error(message: &str) -> Error {
    Error::Config(message.to_string())
}

/// Helper to create validation errors
pub fn validation_error(message: &str) -> Error {
    Error::Validation(message.to_string())
}

/// Helper to create credential errors
pub fn credential_error(message: &str) -> Error {
    Error::Credential(message.to_string())
}

/// Helper to create notification errors
pub fn notification_error(message: &str) -> Error {
    Error::Notification(message.to_string())
}

/// Helper to create other errors
pub fn other_error(message: &str) -> Error {
    Error::Other(message.to_string())
}
