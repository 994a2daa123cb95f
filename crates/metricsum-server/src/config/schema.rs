use std::net::SocketAddr;
use std::time::Duration;

use serde::Deserialize;
use metricsum_core::error::{MetricSumError, Result};
use metricsum_core::StoreOptions;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub store: StoreSection,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: 1,
            server: ServerSection::default(),
            store: StoreSection::default(),
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(MetricSumError::InvalidInput(format!(
                "unsupported config version {}",
                self.version
            )));
        }

        self.server.validate()?;
        self.store.validate()?;

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Bounded wait for in-flight requests (and the store) after a signal.
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
        }
    }
}

impl ServerSection {
    pub fn validate(&self) -> Result<()> {
        self.listen_addr()?;
        if !(100..=60_000).contains(&self.shutdown_grace_ms) {
            return Err(MetricSumError::InvalidInput(
                "server.shutdown_grace_ms must be between 100 and 60000".into(),
            ));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen.parse().map_err(|e| {
            MetricSumError::InvalidInput(format!(
                "server.listen must be a valid socket address ({}): {e}",
                self.listen
            ))
        })
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

fn default_listen() -> String {
    "0.0.0.0:9000".into()
}
fn default_shutdown_grace_ms() -> u64 {
    5000
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreSection {
    #[serde(default = "default_ttl_ms")]
    pub ttl_ms: u64,

    #[serde(default = "default_expiry_queue_capacity")]
    pub expiry_queue_capacity: usize,

    /// Live events across all keys; records beyond this are refused.
    #[serde(default = "default_max_pending_expiries")]
    pub max_pending_expiries: u64,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            ttl_ms: default_ttl_ms(),
            expiry_queue_capacity: default_expiry_queue_capacity(),
            max_pending_expiries: default_max_pending_expiries(),
        }
    }
}

impl StoreSection {
    pub fn validate(&self) -> Result<()> {
        if !(1..=604_800_000).contains(&self.ttl_ms) {
            return Err(MetricSumError::InvalidInput(
                "store.ttl_ms must be between 1 and 604800000".into(),
            ));
        }
        if !(1..=16_777_216).contains(&self.expiry_queue_capacity) {
            return Err(MetricSumError::InvalidInput(
                "store.expiry_queue_capacity must be between 1 and 16777216".into(),
            ));
        }
        if !(1..=1_073_741_824).contains(&self.max_pending_expiries) {
            return Err(MetricSumError::InvalidInput(
                "store.max_pending_expiries must be between 1 and 1073741824".into(),
            ));
        }
        Ok(())
    }

    pub fn to_options(&self) -> StoreOptions {
        StoreOptions {
            ttl: Duration::from_millis(self.ttl_ms),
            queue_capacity: self.expiry_queue_capacity,
            max_pending: self.max_pending_expiries,
        }
    }
}

fn default_ttl_ms() -> u64 {
    60 * 60 * 1000
}
fn default_expiry_queue_capacity() -> usize {
    65_536
}
fn default_max_pending_expiries() -> u64 {
    4_194_304
}
