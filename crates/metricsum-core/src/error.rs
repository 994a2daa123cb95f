//! Shared error type across metricsum crates.

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Invalid input / malformed request.
    BadRequest,
    /// Metric key was never recorded.
    NotFound,
    /// Store is shutting down.
    Unavailable,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::NotFound => "NOT_FOUND",
            ClientCode::Unavailable => "UNAVAILABLE",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, MetricSumError>;

/// Unified error type used by the store and the server.
#[derive(Debug, Error)]
pub enum MetricSumError {
    #[error("could not find sum for metric key {0}")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("sum for metric key {0} does not fit in a signed 64-bit integer")]
    Overflow(String),
    #[error("store is shutting down")]
    Closed,
    #[error("internal: {0}")]
    Internal(String),
}

impl MetricSumError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            MetricSumError::NotFound(_) => ClientCode::NotFound,
            MetricSumError::InvalidInput(_) => ClientCode::BadRequest,
            MetricSumError::Overflow(_) => ClientCode::Internal,
            MetricSumError::Closed => ClientCode::Unavailable,
            MetricSumError::Internal(_) => ClientCode::Internal,
        }
    }
}
