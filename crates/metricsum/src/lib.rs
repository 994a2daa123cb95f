//! Top-level facade crate for metricsum.
//!
//! Re-exports the counter store and the HTTP server library so users can depend on a single crate.

pub mod core {
    pub use metricsum_core::*;
}

pub mod server {
    pub use metricsum_server::*;
}
