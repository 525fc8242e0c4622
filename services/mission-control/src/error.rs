//! Error types for the mission-control service

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::activation::ActivationError;
use crate::uplink::UplinkError;

/// Errors that can occur in the mission-control service
#[derive(Debug, thiserror::Error)]
pub enum MissionControlError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Payload error: {0}")]
    Uplink(#[from] UplinkError),

    #[error("Activation failed: {0}")]
    Activation(#[from] ActivationError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),
}

impl MissionControlError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            MissionControlError::Config(_)
            | MissionControlError::Io(_)
            | MissionControlError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
            MissionControlError::Http(_) | MissionControlError::Database(_) => {
                StatusCode::BAD_GATEWAY
            }
            MissionControlError::Uplink(_) => StatusCode::UNPROCESSABLE_ENTITY,
            MissionControlError::Activation(e) => e.status_code(),
            MissionControlError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            MissionControlError::Unauthorized => StatusCode::UNAUTHORIZED,
            MissionControlError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for MissionControlError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::warn!("Request failed with {}: {}", status, self);
        } else {
            tracing::debug!("Request rejected with {}: {}", status, self);
        }
        let body = axum::Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

/// Result type alias for mission-control operations
pub type Result<T> = std::result::Result<T, MissionControlError>;
