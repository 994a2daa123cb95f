//! metricsum core: the decaying counter store and its error surface.
//!
//! Clients record signed events against a string key; the store keeps a
//! running sum per key and reverses each event's contribution once its TTL
//! elapses. This crate knows nothing about HTTP so the server, tests, and any
//! embedding process can construct independent stores.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `MetricSumError`/`Result` so a bad
//! request or a torn-down store never brings the process down.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod key;
pub mod store;

pub use error::{ClientCode, MetricSumError, Result};
pub use key::validate_key;
pub use store::{DecayingStore, MetricStore, ShutdownReport, StoreOptions, StoreStats};
