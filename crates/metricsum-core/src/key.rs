//! Metric key validation.

use crate::error::{MetricSumError, Result};

/// Reject keys that are empty or could not have come from a single URL path
/// segment. Keys are otherwise opaque: no trimming, no case folding.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(MetricSumError::InvalidInput("metric key must not be empty".into()));
    }
    if key.contains('/') {
        return Err(MetricSumError::InvalidInput(format!(
            "metric key must not contain '/': {key:?}"
        )));
    }
    if key.chars().any(|c| c.is_ascii_control()) {
        return Err(MetricSumError::InvalidInput(format!(
            "metric key must not contain control characters: {key:?}"
        )));
    }
    Ok(())
}
