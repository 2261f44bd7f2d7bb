//! Configuration Types

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub tunnel: TunnelConfig,
    pub logging: LoggingConfig,
}

/// Listener and session configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Concurrent client limit; unset means unbounded
    pub max_connections: Option<usize>,
    pub buffer_size: usize,
    /// Limit on greeting plus request; unset means no limit
    #[serde(with = "humantime_serde")]
    pub handshake_timeout: Option<Duration>,
    /// Limit on a single tunnel dial; unset means no limit
    #[serde(with = "humantime_serde")]
    pub dial_timeout: Option<Duration>,
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
    /// Send RFC 1928 failure replies instead of just closing
    pub reply_on_failure: bool,
}

/// Tunnel configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TunnelConfig {
    /// Network kind passed to the dialer
    pub network: String,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            tunnel: TunnelConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 7788)),
            max_connections: None,
            buffer_size: 8192,
            handshake_timeout: None,
            dial_timeout: None,
            shutdown_timeout: Duration::from_secs(30),
            reply_on_failure: false,
        }
    }
}

impl Default for TunnelConfig {
    fn default() -> Self {
        Self {
            network: "tcp".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
