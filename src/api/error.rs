use crate::error::Error;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

/// Body of 400 and 500 responses
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Failure of an HTTP handler, already mapped to a status code
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: Option<String>,
}

impl ApiError {
    /// 400 with a message meant for the client
    pub fn bad_request(message: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: Some(message.to_string()),
        }
    }

    /// 404 with an empty body
    pub fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: None,
        }
    }

    /// 500. The cause is logged; the client only learns what was being done.
    pub fn internal(action: &str, cause: &Error) -> Self {
        error!("Error while {}: {:?}", action, cause);
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: Some(format!("An error occurred while {}.", action)),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.message {
            Some(error) => (self.status, Json(ErrorResponse { error })).into_response(),
            None => self.status.into_response(),
        }
    }
}
