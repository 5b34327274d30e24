//! Error types for vpr-server
//!
//! Every handler error is rendered as an HTTP status plus a `{detail}` body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;
use vpr_common::api::ErrorResponse;
use vpr_common::SequenceError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Required form field missing (422)
    #[error("Unprocessable request: {0}")]
    Unprocessable(String),

    /// Upload does not match the current task (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Body rejected before reaching the handler (size limit, malformed multipart)
    #[error("Request rejected ({status}): {detail}")]
    Rejected { status: StatusCode, detail: String },

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// vpr-common error
    #[error("Common error: {0}")]
    Common(#[from] vpr_common::Error),
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Common(vpr_common::Error::Database(err))
    }
}

impl From<SequenceError> for ApiError {
    fn from(err: SequenceError) -> Self {
        ApiError::Conflict(err.to_string())
    }
}

impl ApiError {
    fn status_and_detail(self) -> (StatusCode, String) {
        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Rejected { status, detail } => (status, detail),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            ApiError::Io(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            ApiError::Common(err) => match err {
                vpr_common::Error::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
                vpr_common::Error::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
                other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = self.status_and_detail();

        if status.is_server_error() {
            error!(status = %status, "{}", detail);
        }

        (status, Json(ErrorResponse::new(detail))).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
