#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::time::Duration;

use metricsum_core::{ClientCode, DecayingStore, MetricStore, ShutdownReport, StoreOptions};

fn store_with_ttl(ttl: Duration) -> DecayingStore {
    DecayingStore::new(StoreOptions {
        ttl,
        ..StoreOptions::default()
    })
    .expect("store must start")
}

#[tokio::test(start_paused = true)]
async fn shutdown_cancels_pending_and_closes() {
    let store = store_with_ttl(Duration::from_secs(3600));
    store.record_event("k", 1).unwrap();
    store.record_event("k", 2).unwrap();
    store.record_event("j", 3).unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    let report = store.shutdown(Duration::from_secs(5)).await;
    assert_eq!(report.cancelled, 3);
    assert!(!report.abandoned);
    assert!(store.is_closed());

    assert_eq!(
        store.record_event("k", 1).unwrap_err().client_code(),
        ClientCode::Unavailable
    );
    assert_eq!(
        store.query_sum("k").unwrap_err().client_code(),
        ClientCode::Unavailable
    );

    let stats = store.stats();
    assert_eq!(stats.expiries_cancelled, 3);
    assert_eq!(stats.expiries_fired, 0);
    assert_eq!(stats.expiries_pending, 0);
}

#[tokio::test(start_paused = true)]
async fn shutdown_counts_expiries_still_queued() {
    let store = store_with_ttl(Duration::from_secs(3600));
    // No yield: both expiries are still in the intake queue.
    store.record_event("k", 1).unwrap();
    store.record_event("k", 1).unwrap();

    let report = store.shutdown(Duration::from_secs(5)).await;
    assert_eq!(report.cancelled, 2);
}

#[tokio::test(start_paused = true)]
async fn shutdown_is_idempotent() {
    let store = store_with_ttl(Duration::from_secs(1));
    let first = store.shutdown(Duration::from_secs(5)).await;
    let second = store.shutdown(Duration::from_secs(5)).await;
    assert!(!first.abandoned);
    assert_eq!(second, ShutdownReport::default());
}

#[tokio::test(start_paused = true)]
async fn shutdown_through_trait_object() {
    let store: Box<dyn MetricStore> = Box::new(store_with_ttl(Duration::from_secs(1)));
    store.record_event("k", 8).unwrap();
    assert_eq!(store.query_sum("k").unwrap(), 8);

    let report = store.shutdown(Duration::from_secs(1)).await;
    assert_eq!(report.cancelled, 1);
}

#[tokio::test(start_paused = true)]
async fn dropping_store_with_pending_expiries_is_safe() {
    let store = store_with_ttl(Duration::from_millis(100));
    for i in 0..50 {
        store.record_event("k", i).unwrap();
    }
    tokio::time::sleep(Duration::from_millis(10)).await;
    drop(store);

    // Outstanding deadlines pass with the map already gone.
    tokio::time::sleep(Duration::from_millis(500)).await;

    let fresh = store_with_ttl(Duration::from_millis(100));
    fresh.record_event("k", 1).unwrap();
    assert_eq!(fresh.query_sum("k").unwrap(), 1);
}
