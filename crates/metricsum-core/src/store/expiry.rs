//! Expiry scheduler: one background task draining a deadline heap.
//!
//! The store hands every recorded event's reversal to this worker through a
//! bounded queue. The worker keeps pending expiries in a min-heap keyed by
//! fire time, sleeps until the earliest one is due, and applies every due
//! reversal under the per-key lock of the counter map. Each `PendingExpiry` is
//! moved out of the heap exactly once, either into `fire` or into the
//! cancellation count, so an event can never be reversed twice.
//!
//! The worker only holds a `Weak` handle to the counter map. Once the store
//! is gone, due expiries are discarded instead of touching freed state.

use std::cmp::{Ordering as CmpOrdering, Reverse};
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Instant};

/// Key -> running sum. Shared between the store (strong) and the worker (weak).
///
/// Sums are held wider than the `i64` API so that an expiry can take the live
/// total past `i64` range and back again without losing it.
pub(crate) type Counters = DashMap<String, i128>;

/// The scheduled reversal of one recorded event.
#[derive(Debug)]
pub(crate) struct PendingExpiry {
    pub key: String,
    pub value: i64,
    pub fire_at: Instant,
}

/// Lifetime counts, shared with the store for stats.
///
/// `pending` is reserved by the store before an event is applied and released
/// exactly once: when its expiry fires, is cancelled, or the record fails.
#[derive(Debug, Default)]
pub(crate) struct ExpiryCounters {
    pub scheduled: AtomicU64,
    pub fired: AtomicU64,
    pub cancelled: AtomicU64,
    pub pending: AtomicU64,
}

impl ExpiryCounters {
    /// Take one pending slot unless `max` are already in use.
    pub(crate) fn try_reserve_pending(&self, max: u64) -> bool {
        self.pending
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |p| {
                (p < max).then_some(p + 1)
            })
            .is_ok()
    }

    pub(crate) fn release_pending(&self, n: u64) {
        let _ = self
            .pending
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |p| {
                Some(p.saturating_sub(n))
            });
    }

    /// Move every still-pending expiry into `cancelled`. Used once the worker
    /// is gone and nothing else will release them.
    pub(crate) fn cancel_all_pending(&self) -> u64 {
        let left = self.pending.swap(0, Ordering::AcqRel);
        self.cancelled.fetch_add(left, Ordering::Relaxed);
        left
    }
}

/// Heap entry. `seq` keeps same-deadline expiries in arrival order.
#[derive(Debug)]
struct Scheduled {
    fire_at: Instant,
    seq: u64,
    expiry: PendingExpiry,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.fire_at == other.fire_at && self.seq == other.seq
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.fire_at
            .cmp(&other.fire_at)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

pub(crate) struct ExpiryWorker {
    rx: mpsc::Receiver<PendingExpiry>,
    shutdown: watch::Receiver<bool>,
    counters: Weak<Counters>,
    stats: Arc<ExpiryCounters>,
    heap: BinaryHeap<Reverse<Scheduled>>,
    seq: u64,
}

impl ExpiryWorker {
    pub(crate) fn new(
        rx: mpsc::Receiver<PendingExpiry>,
        shutdown: watch::Receiver<bool>,
        counters: Weak<Counters>,
        stats: Arc<ExpiryCounters>,
    ) -> Self {
        Self {
            rx,
            shutdown,
            counters,
            stats,
            heap: BinaryHeap::new(),
            seq: 0,
        }
    }

    /// Run until shutdown is signalled or every sender is gone.
    /// Returns how many expiries were cancelled on the way out.
    pub(crate) async fn run(mut self) -> usize {
        loop {
            let next = self.heap.peek().map(|Reverse(s)| s.fire_at);
            let due = async move {
                match next {
                    Some(at) => sleep_until(at).await,
                    None => std::future::pending::<()>().await,
                }
            };

            // Due timers are polled before the intake queue so a busy
            // producer cannot starve reversals.
            tokio::select! {
                biased;
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        break;
                    }
                }
                _ = due => self.fire_due(),
                msg = self.rx.recv() => match msg {
                    Some(expiry) => self.push(expiry),
                    None => break,
                },
            }
        }

        let cancelled = self.cancel_pending();
        tracing::debug!(cancelled, "expiry worker stopped");
        cancelled
    }

    fn push(&mut self, expiry: PendingExpiry) {
        self.seq = self.seq.wrapping_add(1);
        self.heap.push(Reverse(Scheduled {
            fire_at: expiry.fire_at,
            seq: self.seq,
            expiry,
        }));
    }

    fn fire_due(&mut self) {
        let Some(counters) = self.counters.upgrade() else {
            // Store torn down: nothing left to reverse against.
            let dropped = self.cancel_pending();
            tracing::debug!(dropped, "counter map gone; discarding pending expiries");
            return;
        };

        let now = Instant::now();
        while self
            .heap
            .peek()
            .is_some_and(|Reverse(next)| next.fire_at <= now)
        {
            let Some(Reverse(due)) = self.heap.pop() else {
                break;
            };
            fire(&counters, due.expiry);
            self.stats.fired.fetch_add(1, Ordering::Relaxed);
            self.stats.release_pending(1);
        }
    }

    fn cancel_pending(&mut self) -> usize {
        let mut cancelled = self.heap.len();
        self.heap.clear();

        self.rx.close();
        while self.rx.try_recv().is_ok() {
            cancelled += 1;
        }

        self.stats
            .cancelled
            .fetch_add(cancelled as u64, Ordering::Relaxed);
        self.stats.release_pending(cancelled as u64);
        cancelled
    }
}

fn fire(counters: &Counters, expiry: PendingExpiry) {
    match counters.get_mut(&expiry.key) {
        Some(mut entry) => {
            let sum = entry.value_mut();
            *sum = sum.wrapping_sub(i128::from(expiry.value));
            tracing::debug!(key = %expiry.key, value = expiry.value, sum = %sum, "cleaning expired metric event");
        }
        None => {
            tracing::warn!(key = %expiry.key, value = expiry.value, "expiry for unknown metric key ignored");
        }
    }
}
