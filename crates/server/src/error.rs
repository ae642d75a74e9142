// crates/server/src/error.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use chartmatch_core::{CoreError, JobId};

/// Structured JSON error response for API errors
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

/// API error types that map to HTTP status codes
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("{0}")]
    Core(#[from] CoreError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            ApiError::JobNotFound(id) => {
                tracing::warn!(job_id = %id, "Job not found");
                (
                    StatusCode::NOT_FOUND,
                    ErrorResponse::with_details("Job not found", format!("Job ID: {}", id)),
                )
            }
            ApiError::Core(core_err) => {
                let (status, error_msg) = match core_err {
                    CoreError::NotFound(id) => {
                        tracing::warn!(job_id = %id, "Job not found");
                        (StatusCode::NOT_FOUND, "Job not found")
                    }
                    CoreError::UnsupportedFormat(name) => {
                        tracing::warn!(filename = %name, "Unsupported file format");
                        (StatusCode::BAD_REQUEST, "Unsupported file format")
                    }
                    CoreError::UnknownCategory(value) => {
                        tracing::warn!(category = %value, "Unknown category");
                        (StatusCode::BAD_REQUEST, "Unknown category")
                    }
                    CoreError::InvalidParams(msg) => {
                        tracing::warn!(message = %msg, "Invalid analysis parameters");
                        (StatusCode::BAD_REQUEST, "Invalid analysis parameters")
                    }
                    CoreError::Storage { path, source } => {
                        tracing::error!(path = %path.display(), error = %source, "Storage error");
                        (StatusCode::INTERNAL_SERVER_ERROR, "Storage error")
                    }
                };
                (
                    status,
                    ErrorResponse::with_details(error_msg, core_err.to_string()),
                )
            }
            ApiError::BadRequest(msg) => {
                tracing::warn!(message = %msg, "Bad request");
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::with_details("Bad request", msg.clone()),
                )
            }
            ApiError::Internal(msg) => {
                tracing::error!(message = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("Internal server error"),
                )
            }
        };

        (status, Json(error_response)).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

/// Parse a path segment as a job id.
///
/// An id that does not parse cannot name any job, so it maps to the same
/// 404 as an unknown id rather than a 400.
pub fn parse_job_id(raw: &str) -> Result<JobId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::JobNotFound(raw.to_string()))
}
