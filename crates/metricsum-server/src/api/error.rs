//! Error -> HTTP response mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use metricsum_core::error::{ClientCode, MetricSumError};

/// Handler error carrying the status, stable code and client message.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: ClientCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: ClientCode::BadRequest,
            message: message.into(),
        }
    }

    pub fn route_not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code: ClientCode::NotFound,
            message: "not found".into(),
        }
    }

    /// Map a store error, replacing internal details with `internal_msg`.
    pub fn from_store(err: MetricSumError, internal_msg: &str) -> Self {
        let code = err.client_code();
        let message = match err {
            MetricSumError::Internal(_) => internal_msg.to_string(),
            other => other.to_string(),
        };
        Self {
            status: status_for(code),
            code,
            message,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> ClientCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<MetricSumError> for ApiError {
    fn from(err: MetricSumError) -> Self {
        Self::from_store(err, "internal error")
    }
}

pub fn status_for(code: ClientCode) -> StatusCode {
    match code {
        ClientCode::BadRequest => StatusCode::BAD_REQUEST,
        ClientCode::NotFound => StatusCode::NOT_FOUND,
        ClientCode::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        ClientCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.code.as_str(),
            "message": self.message,
        }));
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_statuses() {
        let cases = [
            (MetricSumError::NotFound("k".into()), StatusCode::NOT_FOUND),
            (MetricSumError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (MetricSumError::Closed, StatusCode::SERVICE_UNAVAILABLE),
            (MetricSumError::Overflow("k".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (MetricSumError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn internal_details_are_hidden() {
        let err = ApiError::from_store(
            MetricSumError::Internal("expiry queue is full".into()),
            "failed to save metric event",
        );
        assert_eq!(err.message(), "failed to save metric event");
        assert_eq!(err.code(), ClientCode::Internal);
    }

    #[test]
    fn overflow_keeps_store_message() {
        let err = ApiError::from(MetricSumError::Overflow("big".into()));
        assert_eq!(err.code(), ClientCode::Internal);
        assert_eq!(
            err.message(),
            "sum for metric key big does not fit in a signed 64-bit integer"
        );
    }

    #[test]
    fn not_found_keeps_store_message() {
        let err = ApiError::from(MetricSumError::NotFound("abc".into()));
        assert_eq!(err.message(), "could not find sum for metric key abc");
    }
}
