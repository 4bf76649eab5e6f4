//! Record store error types
//!
//! Defines all errors that can occur talking to a record store backend.

use thiserror::Error;

/// Errors that can occur in the record store gateway
#[derive(Error, Debug)]
pub enum StoreError {
    /// Backend could not be reached
    #[error("Record store unavailable")]
    Unavailable,

    /// Backend did not answer in time
    #[error("Record store request timed out")]
    Timeout,

    /// HTTP transport failure
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Backend answered with an error status
    #[error("Record store error {status}: {message}")]
    Api { status: u16, message: String },

    /// Requested document does not exist
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Collection name cannot be used by this backend
    #[error("Invalid collection name: {0}")]
    InvalidCollection(String),

    /// Backend returned a document we could not decode at all
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Whether the failure is network-class and worth retrying by the user
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Unavailable | StoreError::Timeout | StoreError::Request(_) => true,
            StoreError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::NotFound("abc".to_string());
        assert_eq!(err.to_string(), "Record not found: abc");

        let err = StoreError::Api {
            status: 503,
            message: "backend down".to_string(),
        };
        assert_eq!(err.to_string(), "Record store error 503: backend down");
    }

    #[test]
    fn test_transient_classification() {
        assert!(StoreError::Unavailable.is_transient());
        assert!(StoreError::Timeout.is_transient());
        assert!(StoreError::Api {
            status: 502,
            message: String::new()
        }
        .is_transient());
        assert!(!StoreError::Api {
            status: 403,
            message: String::new()
        }
        .is_transient());
        assert!(!StoreError::NotFound("x".into()).is_transient());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let store_err: StoreError = io_err.into();
        assert!(matches!(store_err, StoreError::Io(_)));
    }
}
