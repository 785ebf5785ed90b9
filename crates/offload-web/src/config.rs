//! HTTP server configuration.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration for the request-handler surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Simulated per-call delay when a route takes no `sleep` parameter.
    #[serde(default = "default_delay_ms")]
    pub default_delay_ms: u64,
    /// SQLite database file. `None` keeps records in memory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,
    /// Messages inserted at startup when the store is empty.
    #[serde(default)]
    pub seed: Vec<String>,
}

fn default_host() -> IpAddr { IpAddr::from([127, 0, 0, 1]) }
fn default_port() -> u16 { 8000 }
fn default_delay_ms() -> u64 { 1000 }

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            default_delay_ms: default_delay_ms(),
            database: None,
            seed: Vec::new(),
        }
    }
}

impl WebConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
