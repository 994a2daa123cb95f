#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use metricsum_core::{DecayingStore, StoreOptions};

const KEYS: [&str; 3] = ["a", "b", "c"];

fn store_with_ttl(ttl: Duration) -> Arc<DecayingStore> {
    Arc::new(
        DecayingStore::new(StoreOptions {
            ttl,
            ..StoreOptions::default()
        })
        .expect("store must start"),
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_records_lose_no_updates() {
    let store = store_with_ttl(Duration::from_secs(3600));
    let tasks = (0..8).map(|_| {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            for _ in 0..1000 {
                store.record_event("hot", 3).unwrap();
            }
        })
    });
    for res in join_all(tasks).await {
        res.unwrap();
    }

    assert_eq!(store.query_sum("hot").unwrap(), 8 * 1000 * 3);
    assert_eq!(store.stats().expiries_scheduled, 8000);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn every_event_expires_exactly_once_under_load() {
    let store = store_with_ttl(Duration::from_millis(50));
    let tasks = (0..6i64).map(|n| {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            for i in 0..300i64 {
                let key = KEYS[((n + i) % 3) as usize];
                store.record_event(key, n + 1).unwrap();
                if i % 50 == 0 {
                    tokio::task::yield_now().await;
                }
            }
        })
    });
    for res in join_all(tasks).await {
        res.unwrap();
    }

    let mut settled = false;
    for _ in 0..500 {
        let stats = store.stats();
        if stats.expiries_pending == 0 {
            settled = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(settled, "expiries never drained: {:?}", store.stats());

    for key in KEYS {
        assert_eq!(store.query_sum(key).unwrap(), 0, "key {key}");
    }
    let stats = store.stats();
    assert_eq!(stats.expiries_scheduled, 6 * 300);
    assert_eq!(stats.expiries_fired, 6 * 300);
    assert_eq!(stats.expiries_cancelled, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn queries_race_with_expiries_without_torn_reads() {
    let store = store_with_ttl(Duration::from_millis(20));
    for _ in 0..200 {
        store.record_event("k", 5).unwrap();
    }

    let reader = {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            for _ in 0..200 {
                let sum = store.query_sum("k").unwrap();
                assert!(sum >= 0 && sum % 5 == 0, "unexpected sum {sum}");
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
    };
    reader.await.unwrap();
}
