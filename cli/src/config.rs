//! Application configuration: one YAML document covering every crate.
//!
//! ```yaml
//! web:
//!   port: 8080
//!   database: ./offload.db
//!   seed: ["hello", "world"]
//! bridge:
//!   max_workers: 4
//! batch:
//!   chunk_size: 10
//! log:
//!   level: debug
//!   json: true
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use offload_core::{BatchConfig, BridgeConfig};
use offload_web::WebConfig;
use serde::{Deserialize, Serialize};

use crate::tracing_setup::LogConfig;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl AppConfig {
    /// Load from `path`, or fall back to defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("read config file '{}'", path.display()))?;
                Self::from_yaml(&text).with_context(|| format!("parse config file '{}'", path.display()))
            }
            None => Ok(Self::default()),
        }
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.bridge.validate()?;
        self.batch.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_document_keeps_defaults() {
        let cfg = AppConfig::from_yaml(
            "web:\n  port: 9000\nbatch:\n  chunk_size: 3\nlog:\n  components:\n    offload-web: debug\n",
        )
        .unwrap();
        assert_eq!(cfg.web.port, 9000);
        assert_eq!(cfg.web.default_delay_ms, 1000);
        assert_eq!(cfg.batch.chunk_size, 3);
        assert_eq!(cfg.batch.total, 30);
        assert_eq!(cfg.bridge.max_workers, 8);
        assert_eq!(cfg.log.directives(), "info,offload_web=debug");
        cfg.validate().unwrap();
    }

    #[test]
    fn zero_workers_rejected() {
        let cfg = AppConfig::from_yaml("bridge:\n  max_workers: 0\n").unwrap();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("bridge.max_workers"));
    }

    #[test]
    fn seeded_web_section_opens_a_store() {
        let cfg = AppConfig::from_yaml("web:\n  seed: [\"first\", \"second\"]\n").unwrap();
        let store = offload_web::open_store(&cfg.web).unwrap();
        let messages: Vec<_> = store.fetch_all().unwrap().into_iter().map(|r| r.message).collect();
        assert_eq!(messages, ["first", "second"]);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(AppConfig::load(Some(Path::new("/definitely/not/here.yaml"))).is_err());
        assert_eq!(AppConfig::load(None).unwrap(), AppConfig::default());
    }
}
