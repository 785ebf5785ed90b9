//! Bridge and batch configuration.
//!
//! Both structs deserialize with per-field defaults so a partial YAML
//! document (or none at all) yields a usable configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Configuration for the blocking-call bridge and its worker pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Maximum number of blocking operations running at the same time.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    /// Give up waiting for a blocking call after this many milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_timeout_ms: Option<u64>,
}

fn default_max_workers() -> usize { 8 }

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            call_timeout_ms: None,
        }
    }
}

impl BridgeConfig {
    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_workers == 0 {
            return Err(ConfigError::Invalid {
                field: "bridge.max_workers",
                reason: "must be at least 1".into(),
            });
        }
        if self.call_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid {
                field: "bridge.call_timeout_ms",
                reason: "must be positive when set".into(),
            });
        }
        Ok(())
    }
}

/// Configuration for batched fan-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Units dispatched together in one chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Units per batch used by the request handlers.
    #[serde(default = "default_total")]
    pub total: usize,
    /// Fail a unit that takes longer than this many milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_timeout_ms: Option<u64>,
}

fn default_chunk_size() -> usize { 5 }
fn default_total() -> usize { 30 }

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            total: default_total(),
            unit_timeout_ms: None,
        }
    }
}

impl BatchConfig {
    pub fn unit_timeout(&self) -> Option<Duration> {
        self.unit_timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::Invalid {
                field: "batch.chunk_size",
                reason: "must be at least 1".into(),
            });
        }
        if self.unit_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid {
                field: "batch.unit_timeout_ms",
                reason: "must be positive when set".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_handler_surface() {
        let batch = BatchConfig::default();
        assert_eq!(batch.chunk_size, 5);
        assert_eq!(batch.total, 30);
        assert!(batch.unit_timeout().is_none());
        assert_eq!(BridgeConfig::default().max_workers, 8);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: BatchConfig = serde_json::from_str(r#"{"chunk_size": 3}"#).unwrap();
        assert_eq!(cfg.chunk_size, 3);
        assert_eq!(cfg.total, 30);

        let cfg: BridgeConfig = serde_json::from_str(r#"{"call_timeout_ms": 250}"#).unwrap();
        assert_eq!(cfg.max_workers, 8);
        assert_eq!(cfg.call_timeout(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn zero_chunk_size_rejected() {
        let cfg = BatchConfig { chunk_size: 0, ..Default::default() };
        assert!(cfg.validate().is_err());
        let cfg = BridgeConfig { max_workers: 0, ..Default::default() };
        assert!(cfg.validate().is_err());
    }
}
