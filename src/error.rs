//! Error types
//!
//! `BackendError` covers failures talking to the backing service,
//! `StoreError` covers store operations that hand errors back to the caller,
//! and `ApiError` turns both into consistent HTTP responses.

use axum::{
    http::{header::RETRY_AFTER, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Failure reaching or using the backing service.
///
/// A lookup that finds nothing is not an error; it is `Ok(None)`.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error("backing service unreachable: {0}")]
    Transport(String),

    #[error("backing service rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("invalid backing service response: {0}")]
    Decode(String),
}

impl BackendError {
    /// Transport failures and server-side rejections are worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Rejected { status, .. } => *status >= 500,
            Self::Decode(_) => false,
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            Self::Rejected {
                status: status.as_u16(),
                message: e.to_string(),
            }
        } else {
            Self::Transport(e.to_string())
        }
    }
}

/// Errors returned by store operations that report back to the caller.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("message must not be empty")]
    EmptyMessage,

    #[error("invalid incident: {0}")]
    InvalidIncident(String),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Backing service error")]
    Backend(#[from] BackendError),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    /// Whether the client may retry the same request unchanged
    pub retryable: bool,
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Backend(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Unavailable(_) => "UNAVAILABLE",
            Self::Backend(_) => "BACKEND_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn public_message(&self) -> String {
        match self {
            Self::Unauthorized(msg)
            | Self::NotFound(msg)
            | Self::BadRequest(msg)
            | Self::Unavailable(msg) => msg.clone(),
            Self::Backend(_) => "The backing service is unavailable. Please try again.".to_string(),
            // Don't leak internal error details
            Self::Internal(_) => "An internal error occurred".to_string(),
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Backend(_) | Self::Unavailable(_))
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::EmptyMessage => Self::BadRequest(e.to_string()),
            StoreError::InvalidIncident(reason) => Self::BadRequest(reason),
            StoreError::Backend(inner) => Self::Backend(inner),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            Self::Internal(e) => {
                tracing::error!(error = ?e, "Internal server error");
            }
            Self::Backend(e) => {
                tracing::error!(error = %e, "Backing service error");
            }
            _ => {
                tracing::warn!(error = %self, "API error");
            }
        }

        let status = self.status_code();
        let body = ErrorResponse {
            code: self.error_code().to_string(),
            message: self.public_message(),
            retryable: self.retryable(),
        };

        let mut response = (status, Json(body)).into_response();
        if matches!(self, Self::Unavailable(_)) {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from_static("1"));
        }
        response
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(BackendError::Transport("refused".into()).is_transient());
        assert!(BackendError::Rejected {
            status: 503,
            message: "down".into()
        }
        .is_transient());
        assert!(!BackendError::Rejected {
            status: 422,
            message: "bad".into()
        }
        .is_transient());
        assert!(!BackendError::Decode("eof".into()).is_transient());
    }

    #[test]
    fn backend_errors_map_to_retryable_bad_gateway() {
        let err = ApiError::from(StoreError::Backend(BackendError::Transport("x".into())));
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert!(err.retryable());
    }

    #[test]
    fn unavailable_sets_retry_after() {
        let response = ApiError::Unavailable("auth warming up".into()).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers().get(RETRY_AFTER).unwrap(), "1");
    }
}
