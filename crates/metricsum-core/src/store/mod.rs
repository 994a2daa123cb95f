//! Decaying counter store.
//!
//! `DecayingStore` keeps one running sum per metric key. Every recorded
//! event adds its value immediately and schedules its own reversal after the
//! configured TTL; the `expiry` worker applies those reversals in the
//! background. Callers that only need the record/query contract (the HTTP
//! server, test doubles) depend on the `MetricStore` trait.

mod counter_store;
mod expiry;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{MetricSumError, Result};

pub use counter_store::DecayingStore;

/// Default event TTL: one hour.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

/// Default bound on the intake queue between recorders and the worker.
pub const DEFAULT_QUEUE_CAPACITY: usize = 65_536;

/// Default bound on expiries scheduled but not yet fired or cancelled.
pub const DEFAULT_MAX_PENDING: u64 = 4_194_304;

/// Record/query contract consumed by the server.
#[async_trait]
pub trait MetricStore: Send + Sync {
    /// Add `value` to the sum for `key` and schedule its reversal.
    fn record_event(&self, key: &str, value: i64) -> Result<()>;

    /// Current sum for `key`; `NotFound` if the key was never recorded,
    /// `Overflow` if the live sum does not fit in an `i64`.
    fn query_sum(&self, key: &str) -> Result<i64>;

    fn stats(&self) -> StoreStats;

    /// Stop accepting calls and release the expiry worker within `grace`.
    async fn shutdown(&self, grace: Duration) -> ShutdownReport;
}

/// Construction options for `DecayingStore`.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub ttl: Duration,
    /// Intake queue only; expiries leave it as soon as the worker runs.
    pub queue_capacity: usize,
    /// Upper bound on live events across all keys. Records beyond it fail.
    pub max_pending: u64,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            max_pending: DEFAULT_MAX_PENDING,
        }
    }
}

impl StoreOptions {
    pub fn validate(&self) -> Result<()> {
        if self.ttl.is_zero() {
            return Err(MetricSumError::InvalidInput("ttl must be positive".into()));
        }
        if self.queue_capacity == 0 {
            return Err(MetricSumError::InvalidInput(
                "queue_capacity must be positive".into(),
            ));
        }
        if self.max_pending == 0 {
            return Err(MetricSumError::InvalidInput(
                "max_pending must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Point-in-time view of store activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Keys that have ever been recorded (entries are never reclaimed).
    pub keys: usize,
    pub expiries_scheduled: u64,
    pub expiries_fired: u64,
    pub expiries_cancelled: u64,
    /// Scheduled but neither fired nor cancelled yet.
    pub expiries_pending: u64,
}

/// Outcome of `MetricStore::shutdown`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Pending expiries dropped without firing.
    pub cancelled: usize,
    /// The worker did not stop within the grace period and was aborted.
    pub abandoned: bool,
}
