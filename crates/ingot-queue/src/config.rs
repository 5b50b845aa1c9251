//! Queue configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for the dispatch queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Lease duration in milliseconds, granted on dispatch and renewed by
    /// each heartbeat extension.
    #[serde(default = "default_extension_ms")]
    pub extension_ms: u64,
    /// Interval in milliseconds between background dispatcher sweeps. The
    /// dispatcher also wakes on every state change; the sweep bounds how
    /// long an expired lease can sit undetected when the queue is quiet.
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
}

fn default_extension_ms() -> u64 {
    // 10 minutes
    600_000
}

fn default_sweep_interval_ms() -> u64 {
    30_000
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            extension_ms: default_extension_ms(),
            sweep_interval_ms: default_sweep_interval_ms(),
        }
    }
}

impl QueueConfig {
    pub fn extension(&self) -> Duration {
        Duration::from_millis(self.extension_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = QueueConfig::default();
        assert_eq!(config.extension(), Duration::from_secs(600));
        assert_eq!(config.sweep_interval(), Duration::from_secs(30));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: QueueConfig = serde_json::from_str("{\"extension_ms\": 50}").unwrap();
        assert_eq!(config.extension(), Duration::from_millis(50));
        assert_eq!(config.sweep_interval(), Duration::from_secs(30));
    }
}
