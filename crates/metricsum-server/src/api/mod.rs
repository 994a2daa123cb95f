//! Metric HTTP API: handlers plus error-to-response mapping.

pub mod error;
pub mod metric;

pub use error::ApiError;

/// Fallback for every unrouted path.
pub async fn not_found() -> ApiError {
    ApiError::route_not_found()
}
