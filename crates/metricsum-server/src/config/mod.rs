//! Server config loader (strict parsing).

pub mod schema;

use std::fs;
use std::path::Path;

use metricsum_core::error::{MetricSumError, Result};

pub use schema::{AppConfig, ServerSection, StoreSection};

/// Config file picked up from the working directory when no path is given.
pub const DEFAULT_CONFIG_PATH: &str = "metricsum.yaml";

/// Environment variable overriding `server.listen`.
pub const LISTEN_ENV: &str = "METRICSUM_LISTEN";

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| MetricSumError::Internal(format!("read config failed ({path}): {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<AppConfig> {
    let cfg: AppConfig = serde_yaml::from_str(s)
        .map_err(|e| MetricSumError::InvalidInput(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Resolve the process config: an explicit path must load; otherwise the
/// default file is used when present, and built-in defaults when not.
/// `METRICSUM_LISTEN` wins over whatever the file says.
pub fn load(path: Option<&str>) -> Result<AppConfig> {
    let cfg = match path {
        Some(p) => load_from_file(p)?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => load_from_file(DEFAULT_CONFIG_PATH)?,
        None => {
            tracing::info!("no config file; using defaults");
            AppConfig::default()
        }
    };
    with_listen_override(cfg, std::env::var(LISTEN_ENV).ok())
}

pub fn with_listen_override(mut cfg: AppConfig, listen: Option<String>) -> Result<AppConfig> {
    if let Some(listen) = listen.filter(|l| !l.trim().is_empty()) {
        tracing::info!(%listen, env = LISTEN_ENV, "listen address overridden");
        cfg.server.listen = listen;
        cfg.validate()?;
    }
    Ok(cfg)
}
