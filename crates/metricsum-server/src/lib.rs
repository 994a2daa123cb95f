//! metricsum server library entry.
//!
//! This crate wires the config, shared state, metric API, operational
//! endpoints and process lifecycle around a `metricsum-core` store. It is
//! consumed by the binary (`main.rs`) and by integration tests.

pub mod api;
pub mod app_state;
pub mod config;
pub mod lifecycle;
pub mod obs;
pub mod ops;
pub mod router;
