//! Axum router wiring.
//!
//! Metric API routes plus the operational endpoints; anything else falls
//! through to a JSON 404.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{api, app_state::AppState, obs, ops};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/metric/:key", post(api::metric::record_event))
        .route("/metric/:key/sum", get(api::metric::get_sum))
        .route("/healthz", get(ops::healthz))
        .route("/readyz", get(ops::readyz))
        .route("/metrics", get(ops::metrics))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            obs::http::track_requests,
        ))
        .fallback(api::not_found)
        .with_state(state)
}
