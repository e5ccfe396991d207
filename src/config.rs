//! Service options.

use crate::error::{MonitorError, Result};
use serde::{Deserialize, Serialize};

/// Process-wide monitoring options, fixed for the lifetime of the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceOptions {
    /// Records kept per dataset; a computation needs a full window.
    pub window_size: usize,

    /// Minimum interval between two computations of the same dataset.
    pub calculation_period_sec: u64,

    /// Prefix of exposed metric names (`<prefix>:<metric>`).
    pub metric_prefix: String,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            window_size: 50,
            calculation_period_sec: 15,
            metric_prefix: "riskwatch".to_string(),
        }
    }
}

impl ServiceOptions {
    /// Cooldown period in milliseconds.
    pub fn calculation_period_ms(&self) -> u64 {
        self.calculation_period_sec.saturating_mul(1000)
    }

    /// Namespace of the service's own counters (`<namespace>_..._total`).
    pub fn telemetry_namespace(&self) -> &str {
        if self.metric_prefix.is_empty() {
            "riskwatch"
        } else {
            &self.metric_prefix
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            return Err(MonitorError::InvalidConfig(
                "window_size must be at least 1".to_string(),
            ));
        }
        if !is_valid_prefix(&self.metric_prefix) {
            return Err(MonitorError::InvalidConfig(format!(
                "metric_prefix '{}' must match [a-zA-Z_][a-zA-Z0-9_]*",
                self.metric_prefix
            )));
        }
        Ok(())
    }
}

fn is_valid_prefix(prefix: &str) -> bool {
    let mut chars = prefix.chars();
    match chars.next() {
        None => true,
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
    }
}
