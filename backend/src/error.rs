//! Error handling for the Fishing Forecast service
//!
//! Every error maps to a status code and a JSON body of the form
//! `{"error": {"code", "message", "field"}}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::validation::InputError;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Invalid {field}: {message}")]
    InvalidInput { field: String, message: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Upstream errors
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Upstream timed out after {0}s")]
    UpstreamTimeout(u64),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl From<InputError> for AppError {
    fn from(err: InputError) -> Self {
        match err {
            InputError::InvalidProfile(message) => AppError::Validation(message),
            InputError::InvalidSamples(message) => AppError::InvalidInput {
                field: "samples".to_string(),
                message,
            },
        }
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl AppError {
    fn status_and_detail(&self) -> (StatusCode, ErrorDetail) {
        match self {
            AppError::InvalidInput { field, message } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "INVALID_INPUT".to_string(),
                    message: message.clone(),
                    field: Some(field.clone()),
                },
            ),
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "VALIDATION_ERROR".to_string(),
                    message: msg.clone(),
                    field: None,
                },
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail {
                    code: "NOT_FOUND".to_string(),
                    message: format!("{} not found", resource),
                    field: None,
                },
            ),
            AppError::UpstreamUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorDetail {
                    code: "UPSTREAM_UNAVAILABLE".to_string(),
                    message: format!("Condition source unavailable: {}", msg),
                    field: None,
                },
            ),
            AppError::UpstreamTimeout(seconds) => (
                StatusCode::GATEWAY_TIMEOUT,
                ErrorDetail {
                    code: "UPSTREAM_TIMEOUT".to_string(),
                    message: format!("Condition source did not respond within {}s", seconds),
                    field: None,
                },
            ),
            AppError::Configuration(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "CONFIGURATION_ERROR".to_string(),
                    message: format!("Configuration error: {}", msg),
                    field: None,
                },
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "INTERNAL_ERROR".to_string(),
                    message: msg.clone(),
                    field: None,
                },
            ),
            AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "INTERNAL_ERROR".to_string(),
                    message: "An internal server error occurred".to_string(),
                    field: None,
                },
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = self.status_and_detail();

        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::debug!("Rejected request: {}", self);
        }

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
