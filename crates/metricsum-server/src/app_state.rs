//! Shared application state for the metricsum server.
//!
//! Built once in `main` (or per test) and cloned into every handler. The
//! store sits behind the `MetricStore` trait so tests can substitute doubles.

use std::sync::Arc;

use metricsum_core::error::Result;
use metricsum_core::{DecayingStore, MetricStore};

use crate::config::AppConfig;
use crate::obs::{ExtraMetric, ServerMetrics};

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: AppConfig,
    store: Arc<dyn MetricStore>,
    metrics: ServerMetrics,
}

impl AppState {
    /// Build application state with a fresh `DecayingStore`.
    /// Must run inside a tokio runtime (the store spawns its expiry worker).
    pub fn new(cfg: AppConfig) -> Result<Self> {
        let store = DecayingStore::new(cfg.store.to_options())?;
        Ok(Self::with_store(cfg, Arc::new(store)))
    }

    pub fn with_store(cfg: AppConfig, store: Arc<dyn MetricStore>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                cfg,
                store,
                metrics: ServerMetrics::default(),
            }),
        }
    }

    pub fn cfg(&self) -> &AppConfig {
        &self.inner.cfg
    }

    pub fn store(&self) -> &dyn MetricStore {
        self.inner.store.as_ref()
    }

    pub fn metrics(&self) -> &ServerMetrics {
        &self.inner.metrics
    }

    pub fn set_draining(&self) {
        self.inner.metrics.set_draining();
    }

    pub fn is_draining(&self) -> bool {
        self.inner.metrics.is_draining()
    }

    /// Store gauges and totals appended to the `/metrics` output.
    pub fn metrics_extra(&self) -> Vec<ExtraMetric> {
        let stats = self.store().stats();
        vec![
            ("metricsum_store_keys", "gauge", stats.keys as u64),
            ("metricsum_expiries_pending", "gauge", stats.expiries_pending),
            ("metricsum_expiries_scheduled_total", "counter", stats.expiries_scheduled),
            ("metricsum_expiries_fired_total", "counter", stats.expiries_fired),
            ("metricsum_expiries_cancelled_total", "counter", stats.expiries_cancelled),
        ]
    }
}
