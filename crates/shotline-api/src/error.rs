//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use shotline_continuity::ContinuityError;
use shotline_sync::SyncError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Continuity(#[from] ContinuityError),

    #[error("Persistence error: {0}")]
    Sync(#[from] SyncError),
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Sync(_) => StatusCode::BAD_GATEWAY,
            ApiError::Continuity(e) => match e {
                ContinuityError::GroupNotFound { .. } | ContinuityError::SceneNotFound(_) => {
                    StatusCode::NOT_FOUND
                }
                ContinuityError::InvalidConnection { .. } | ContinuityError::InvalidGroup(_) => {
                    StatusCode::BAD_REQUEST
                }
                ContinuityError::Locked(_) | ContinuityError::NoApprovedGroups(_) => {
                    StatusCode::CONFLICT
                }
            },
        }
    }

    /// Machine-readable code for the response body.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            ApiError::Continuity(e) => Some(e.code()),
            ApiError::Validation(_) => Some("validation_error"),
            ApiError::Unavailable(_) => Some("persistence_disabled"),
            ApiError::Sync(_) => Some("persistence_failed"),
            _ => None,
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Don't expose internal error details in production
        let detail = match &self {
            ApiError::Internal(_) | ApiError::Sync(_) => {
                if std::env::var("ENVIRONMENT").unwrap_or_default() == "production" {
                    "An internal error occurred".to_string()
                } else {
                    self.to_string()
                }
            }
            _ => self.to_string(),
        };

        let body = ErrorResponse {
            detail,
            code: self.code().map(str::to_string),
        };

        (status, Json(body)).into_response()
    }
}
