//! Lightweight in-process observability.
//!
//! Request counters and latency histograms are stored as atomics, recorded by
//! the `track_requests` middleware and rendered by the `/metrics` handler.

pub mod http;
pub mod metrics;

pub use metrics::{CounterVec, ExtraMetric, HistogramVec, ServerMetrics};
