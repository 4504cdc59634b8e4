//! HTTP error handling and response types.

use std::fmt;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::db::repository::RepositoryError;

/// Error response body: `{ "error": ..., "details"?: ... }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Application error type for HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Resource not found
    NotFound(String),
    /// Invalid request (missing id, malformed or rejected body)
    BadRequest {
        message: String,
        details: Option<String>,
    },
    /// Internal server error
    Internal {
        message: String,
        details: Option<String>,
    },
    /// Repository error
    Repository(RepositoryError),
}

impl AppError {
    pub fn not_found(what: &str) -> Self {
        AppError::NotFound(format!("{} not found", what))
    }

    pub fn missing_id() -> Self {
        AppError::BadRequest {
            message: "ID not provided".to_string(),
            details: None,
        }
    }

    /// 400 with the reason in `details`.
    pub fn invalid_data(details: impl fmt::Display) -> Self {
        AppError::BadRequest {
            message: "Invalid data".to_string(),
            details: Some(details.to_string()),
        }
    }

    /// Write rejected by validation or by the backend.
    pub fn rejected_write(err: RepositoryError) -> Self {
        Self::invalid_data(err.message())
    }

    pub fn internal(message: impl Into<String>, details: Option<String>) -> Self {
        AppError::Internal {
            message: message.into(),
            details,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            AppError::BadRequest { message, details } => {
                (StatusCode::BAD_REQUEST, message, details)
            }
            AppError::Internal { message, details } => {
                (StatusCode::INTERNAL_SERVER_ERROR, message, details)
            }
            AppError::Repository(e) => match e {
                RepositoryError::ValidationError { message, .. } => {
                    (StatusCode::BAD_REQUEST, "Invalid data".to_string(), Some(message))
                }
                RepositoryError::NotFound { message, .. } => {
                    (StatusCode::NOT_FOUND, message, None)
                }
                other => {
                    log::error!("Request failed: {}", other);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Internal server error".to_string(),
                        Some(other.message().to_string()),
                    )
                }
            },
        };

        (status, Json(ErrorBody { error, details })).into_response()
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        AppError::Repository(err)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::invalid_data(rejection.body_text())
    }
}
