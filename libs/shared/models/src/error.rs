use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// Machine-readable cause attached to validation failures so callers can
/// distinguish a conflicting booking from, say, a malformed timezone without
/// parsing the human-readable message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationReason {
    OutOfRange,
    Conflict,
    MissingField,
    Lockout,
    Timezone,
    Validation,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("{message}")]
    Validation {
        reason: ValidationReason,
        message: String,
    },

    #[error("Internal Server Error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("External service error: {0}")]
    ExternalService(String),
}

impl ApiError {
    pub fn validation(reason: ValidationReason, message: impl Into<String>) -> Self {
        ApiError::Validation {
            reason,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, reason, message) = match &self {
            ApiError::Auth(msg) => (StatusCode::UNAUTHORIZED, None, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, None, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, None, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, None, msg),
            ApiError::Validation { reason, message } => {
                (StatusCode::BAD_REQUEST, Some(*reason), message)
            }
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, None, msg),
            ApiError::Database(msg) => (StatusCode::INTERNAL_SERVER_ERROR, None, msg),
            ApiError::ExternalService(msg) => (StatusCode::BAD_GATEWAY, None, msg),
        };

        tracing::error!("Error: {}: {}", status, message);

        let body = match reason {
            Some(reason) => Json(json!({
                "error": message,
                "reason": reason
            })),
            None => Json(json!({
                "error": message
            })),
        };

        (status, body).into_response()
    }
}
