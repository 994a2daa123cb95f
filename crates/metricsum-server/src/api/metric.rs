//! Metric event handlers.
//!
//! - `POST /metric/:key`      body `{"value": <i64>}` -> 200, empty body
//! - `GET  /metric/:key/sum`  -> 200 `{"value": <i64>}`

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::app_state::AppState;

#[derive(Debug, Deserialize)]
struct EventRequest {
    value: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SumResponse {
    pub value: i64,
}

/// Decode the event body by hand so malformed JSON and a missing `value`
/// get distinct 400 messages instead of the extractor's defaults.
fn decode_event(body: &[u8]) -> Result<i64, ApiError> {
    let req: EventRequest = serde_json::from_slice(body).map_err(|e| {
        tracing::warn!(error = %e, "invalid request body");
        ApiError::bad_request("invalid request")
    })?;
    req.value.ok_or_else(|| {
        tracing::warn!("missing metric value");
        ApiError::bad_request("invalid request; missing metric value")
    })
}

pub async fn record_event(
    State(app): State<AppState>,
    Path(key): Path<String>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    tracing::debug!(%key, "incoming request - record_event");

    let value = decode_event(&body)?;
    app.store().record_event(&key, value).map_err(|e| {
        tracing::error!(%key, value, error = %e, "failed to save metric event");
        app.metrics()
            .store_errors
            .inc(&[("op", "record_event"), ("code", e.client_code().as_str())]);
        ApiError::from_store(e, "failed to save metric event")
    })?;

    tracing::info!(%key, value, "processed request - record_event");
    Ok(StatusCode::OK)
}

pub async fn get_sum(
    State(app): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<SumResponse>, ApiError> {
    tracing::debug!(%key, "incoming request - get_sum");

    let value = app.store().query_sum(&key).map_err(|e| {
        tracing::warn!(%key, error = %e, "sum lookup failed");
        app.metrics()
            .store_errors
            .inc(&[("op", "query_sum"), ("code", e.client_code().as_str())]);
        ApiError::from(e)
    })?;

    tracing::info!(%key, sum = value, "processed request - get_sum");
    Ok(Json(SumResponse { value }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn test_state() -> AppState {
        AppState::new(AppConfig::default()).unwrap()
    }

    #[test]
    fn decode_accepts_value_and_ignores_extra_fields() {
        assert_eq!(decode_event(br#"{"value": 99}"#).unwrap(), 99);
        assert_eq!(decode_event(br#"{"value": -4, "unit": "ms"}"#).unwrap(), -4);
    }

    #[test]
    fn decode_distinguishes_missing_from_malformed() {
        let missing: [&[u8]; 2] = [br#"{}"#, br#"{"value": null}"#];
        for body in missing {
            let err = decode_event(body).unwrap_err();
            assert_eq!(err.message(), "invalid request; missing metric value");
        }
        let malformed: [&[u8]; 4] = [b"", b"not json", br#"{"value": "12"}"#, br#"{"value": 1.5}"#];
        for body in malformed {
            let err = decode_event(body).unwrap_err();
            assert_eq!(err.message(), "invalid request");
            assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn record_then_get_sum() {
        let state = test_state();
        let status = record_event(
            State(state.clone()),
            Path("test".to_string()),
            Bytes::from_static(br#"{"value": 99}"#),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::OK);

        let Json(sum) = get_sum(State(state), Path("test".to_string())).await.unwrap();
        assert_eq!(sum, SumResponse { value: 99 });
    }

    #[tokio::test]
    async fn get_sum_unknown_key() {
        let state = test_state();
        let err = get_sum(State(state.clone()), Path("unknownkey".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            state
                .metrics()
                .store_errors
                .get(&[("op", "query_sum"), ("code", "NOT_FOUND")]),
            1
        );
    }
}
