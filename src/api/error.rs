//! API Error Types
//!
//! Defines error types for the API layer and implements conversion
//! to HTTP responses with appropriate status codes.
//!
//! Every error body carries a `retryable` flag. Clients show retryable errors
//! as a dismissible notice with a retry action and the rest as a blocking one.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::analytics::FilterError;
use crate::import::ImportError;
use crate::records::StoreError;

/// API error types
#[derive(Error, Debug)]
pub enum ApiError {
    /// Request validation failed
    #[error("Validation error: {0}")]
    Validation(String),

    /// Invalid dashboard or map filter
    #[error("Invalid filter: {0}")]
    Filter(#[from] FilterError),

    /// Record store gateway error
    #[error("Record store error: {0}")]
    Store(#[from] StoreError),

    /// Uploaded file could not be parsed; nothing was written
    #[error("Import failed: {0}")]
    Import(#[from] ImportError),

    /// Request conflicts with work in progress
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
    pub request_id: String,
}

/// Error details
#[derive(Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    pub retryable: bool,
}

impl ApiError {
    /// Status code, error code and retryability
    fn classify(&self) -> (StatusCode, &'static str, bool) {
        match self {
            ApiError::Validation(_) | ApiError::Filter(_) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", false)
            }
            ApiError::Store(StoreError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, "RECORD_NOT_FOUND", false)
            }
            ApiError::Store(e) if e.is_transient() => {
                (StatusCode::SERVICE_UNAVAILABLE, "STORE_UNAVAILABLE", true)
            }
            ApiError::Store(StoreError::Api { .. }) => {
                (StatusCode::BAD_GATEWAY, "STORE_ERROR", false)
            }
            ApiError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORE_ERROR", false),
            ApiError::Import(ImportError::Io(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR", false)
            }
            ApiError::Import(_) => (StatusCode::BAD_REQUEST, "IMPORT_PARSE_ERROR", false),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT", true),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", false),
            ApiError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR", false),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, retryable) = self.classify();

        let request_id = uuid::Uuid::new_v4().to_string();

        // Log the error
        tracing::error!(
            request_id = %request_id,
            error_code = %code,
            error_message = %self,
            retryable,
            "API error occurred"
        );

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: self.to_string(),
                retryable,
            },
            request_id,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_store_errors_are_retryable() {
        let (status, code, retryable) = ApiError::Store(StoreError::Timeout).classify();
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(code, "STORE_UNAVAILABLE");
        assert!(retryable);

        let api = StoreError::Api {
            status: 503,
            message: "backend overloaded".to_string(),
        };
        assert!(ApiError::Store(api).classify().2);
    }

    #[test]
    fn test_permanent_errors_block() {
        let (status, code, retryable) =
            ApiError::Import(ImportError::Parse("missing header row".to_string())).classify();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(code, "IMPORT_PARSE_ERROR");
        assert!(!retryable);

        let (status, _, retryable) = ApiError::Store(StoreError::Api {
            status: 403,
            message: "permission denied".to_string(),
        })
        .classify();
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(!retryable);

        let (status, _, _) = ApiError::Store(StoreError::NotFound("abc".to_string())).classify();
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
