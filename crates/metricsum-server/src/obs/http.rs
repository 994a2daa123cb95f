//! Per-route request accounting.

use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use tokio::time::Instant;

use crate::app_state::AppState;

/// Count every routed request by route template, method and status, and
/// record its latency. Installed as a route layer so `MatchedPath` is known.
pub async fn track_requests(State(app): State<AppState>, req: Request, next: Next) -> Response {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());
    let method = req.method().to_string();
    let started = Instant::now();

    let resp = next.run(req).await;

    let status = resp.status().as_u16().to_string();
    let metrics = app.metrics();
    metrics
        .http_requests
        .inc(&[("route", route.as_str()), ("method", method.as_str()), ("status", status.as_str())]);
    metrics
        .http_request_duration
        .observe(&[("route", route.as_str())], started.elapsed());
    resp
}
