use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::error::{MetricSumError, Result};
use crate::key::validate_key;

use super::expiry::{Counters, ExpiryCounters, ExpiryWorker, PendingExpiry};
use super::{MetricStore, ShutdownReport, StoreOptions, StoreStats};

/// In-memory per-key sums with automatic TTL decay.
///
/// Each key's read-modify-write happens under that key's shard lock in the
/// counter map, so concurrent records, queries and expiry firings on the same
/// key are serialized while different keys proceed independently.
pub struct DecayingStore {
    counters: Arc<Counters>,
    expiry_tx: mpsc::Sender<PendingExpiry>,
    shutdown_tx: watch::Sender<bool>,
    worker: Mutex<Option<JoinHandle<usize>>>,
    stats: Arc<ExpiryCounters>,
    closed: AtomicBool,
    ttl: Duration,
    max_pending: u64,
}

impl DecayingStore {
    /// Build a store and spawn its expiry worker on the current tokio runtime.
    /// Fails with `Internal` when called outside a runtime.
    pub fn new(options: StoreOptions) -> Result<Self> {
        options.validate()?;

        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| MetricSumError::Internal(format!("no tokio runtime for expiry worker: {e}")))?;

        let counters = Arc::new(Counters::new());
        let stats = Arc::new(ExpiryCounters::default());
        let (expiry_tx, expiry_rx) = mpsc::channel(options.queue_capacity);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let worker = ExpiryWorker::new(
            expiry_rx,
            shutdown_rx,
            Arc::downgrade(&counters),
            Arc::clone(&stats),
        );
        let join = handle.spawn(worker.run());

        tracing::debug!(
            ttl_ms = options.ttl.as_millis() as u64,
            queue_capacity = options.queue_capacity,
            max_pending = options.max_pending,
            "decaying store started"
        );

        Ok(Self {
            counters,
            expiry_tx,
            shutdown_tx,
            worker: Mutex::new(Some(join)),
            stats,
            closed: AtomicBool::new(false),
            ttl: options.ttl,
            max_pending: options.max_pending,
        })
    }

    /// TTL applied by `record_event`.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Add `value` to `key` and schedule its reversal after the store TTL.
    pub fn record_event(&self, key: &str, value: i64) -> Result<()> {
        self.record_event_with_ttl(key, value, self.ttl)
    }

    /// Same as `record_event` with a per-event TTL.
    ///
    /// A pending slot and a queue slot for the reversal are reserved before
    /// the sum is touched: if the reversal cannot be scheduled the increment
    /// is never applied. An event that would leave the live sum outside the
    /// `i64` range is rejected.
    pub fn record_event_with_ttl(&self, key: &str, value: i64, ttl: Duration) -> Result<()> {
        self.ensure_open()?;
        validate_key(key)?;
        if ttl.is_zero() {
            return Err(MetricSumError::InvalidInput("ttl must be positive".into()));
        }

        if !self.stats.try_reserve_pending(self.max_pending) {
            return Err(MetricSumError::Internal(format!(
                "too many pending expiries (max {})",
                self.max_pending
            )));
        }
        self.apply_reserved(key, value, ttl).inspect_err(|_| {
            self.stats.release_pending(1);
        })
    }

    fn apply_reserved(&self, key: &str, value: i64, ttl: Duration) -> Result<()> {
        let permit = self.expiry_tx.try_reserve().map_err(|e| match e {
            TrySendError::Full(()) => MetricSumError::Internal("expiry queue is full".into()),
            TrySendError::Closed(()) => {
                MetricSumError::Internal("expiry worker is not running".into())
            }
        })?;

        let fire_at = Instant::now()
            .checked_add(ttl)
            .ok_or_else(|| MetricSumError::InvalidInput("ttl is out of range".into()))?;

        {
            let mut sum = self.counters.entry(key.to_owned()).or_insert(0);
            let next = sum
                .checked_add(i128::from(value))
                .filter(|next| i64::try_from(*next).is_ok())
                .ok_or_else(|| {
                    MetricSumError::InvalidInput(format!("sum for metric key {key} would overflow"))
                })?;
            *sum = next;
        }

        self.stats.scheduled.fetch_add(1, Ordering::Relaxed);
        permit.send(PendingExpiry {
            key: key.to_owned(),
            value,
            fire_at,
        });

        tracing::trace!(key, value, ttl_ms = ttl.as_millis() as u64, "recorded metric event");
        Ok(())
    }

    /// Current sum for `key`. Keys that decayed back to zero are still found.
    pub fn query_sum(&self, key: &str) -> Result<i64> {
        self.ensure_open()?;
        validate_key(key)?;
        let sum = self
            .counters
            .get(key)
            .map(|sum| *sum)
            .ok_or_else(|| MetricSumError::NotFound(key.to_owned()))?;
        i64::try_from(sum).map_err(|_| MetricSumError::Overflow(key.to_owned()))
    }

    pub fn stats(&self) -> StoreStats {
        let scheduled = self.stats.scheduled.load(Ordering::Relaxed);
        let fired = self.stats.fired.load(Ordering::Relaxed);
        let cancelled = self.stats.cancelled.load(Ordering::Relaxed);
        StoreStats {
            keys: self.counters.len(),
            expiries_scheduled: scheduled,
            expiries_fired: fired,
            expiries_cancelled: cancelled,
            expiries_pending: self.stats.pending.load(Ordering::Relaxed),
        }
    }

    /// Close the store and stop the expiry worker.
    ///
    /// New calls fail with `Closed` from here on. Pending expiries are
    /// cancelled; if the worker does not finish within `grace` it is aborted,
    /// whatever it still held is counted as cancelled, and the report is
    /// marked abandoned. Calling this again is a no-op.
    pub async fn shutdown(&self, grace: Duration) -> ShutdownReport {
        self.closed.store(true, Ordering::Release);
        let _ = self.shutdown_tx.send(true);

        let join = match self.worker.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let Some(mut join) = join else {
            return ShutdownReport::default();
        };

        match tokio::time::timeout(grace, &mut join).await {
            Ok(Ok(cancelled)) => {
                tracing::info!(cancelled, "decaying store shut down");
                ShutdownReport {
                    cancelled,
                    abandoned: false,
                }
            }
            Ok(Err(e)) => {
                let cancelled = self.stats.cancel_all_pending() as usize;
                tracing::warn!(error = %e, cancelled, "expiry worker ended abnormally");
                ShutdownReport {
                    cancelled,
                    abandoned: true,
                }
            }
            Err(_) => {
                join.abort();
                let cancelled = self.stats.cancel_all_pending() as usize;
                tracing::warn!(grace_ms = grace.as_millis() as u64, cancelled, "expiry worker did not stop in time; aborted");
                ShutdownReport {
                    cancelled,
                    abandoned: true,
                }
            }
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(MetricSumError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl MetricStore for DecayingStore {
    fn record_event(&self, key: &str, value: i64) -> Result<()> {
        DecayingStore::record_event(self, key, value)
    }

    fn query_sum(&self, key: &str) -> Result<i64> {
        DecayingStore::query_sum(self, key)
    }

    fn stats(&self) -> StoreStats {
        DecayingStore::stats(self)
    }

    async fn shutdown(&self, grace: Duration) -> ShutdownReport {
        DecayingStore::shutdown(self, grace).await
    }
}
