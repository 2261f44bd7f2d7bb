//! Configuration Manager

use super::Config;
use anyhow::{Context, Result, bail};
use std::path::Path;
use std::net::SocketAddr;

/// Manages configuration loading and validation
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration from file
    pub fn load_from_file(path: &Path) -> Result<Config> {
        if path.exists() {
            tracing::info!("Loading configuration from: {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;

            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

            config.validate()
                .with_context(|| "Configuration validation failed")?;

            tracing::info!("Configuration loaded and validated successfully");
            Ok(config)
        } else {
            tracing::warn!("Configuration file not found at {}, using defaults", path.display());
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }

    /// Load configuration from environment variables
    pub fn load_from_env() -> Result<Config> {
        Self::load_from_vars(|name| std::env::var(name).ok())
    }

    /// Apply `TUNNELPROXY_*` overrides from `lookup` on top of the defaults
    pub fn load_from_vars<F>(lookup: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(bind_addr) = lookup("TUNNELPROXY_BIND_ADDR") {
            config.server.bind_addr = bind_addr.parse::<SocketAddr>()
                .with_context(|| format!("Invalid TUNNELPROXY_BIND_ADDR: {}", bind_addr))?;
        }

        if let Some(max_conn) = lookup("TUNNELPROXY_MAX_CONNECTIONS") {
            config.server.max_connections = Some(max_conn.parse::<usize>()
                .with_context(|| format!("Invalid TUNNELPROXY_MAX_CONNECTIONS: {}", max_conn))?);
        }

        if let Some(buffer_size) = lookup("TUNNELPROXY_BUFFER_SIZE") {
            config.server.buffer_size = buffer_size.parse::<usize>()
                .with_context(|| format!("Invalid TUNNELPROXY_BUFFER_SIZE: {}", buffer_size))?;
        }

        if let Some(timeout) = lookup("TUNNELPROXY_DIAL_TIMEOUT") {
            config.server.dial_timeout = Some(humantime::parse_duration(&timeout)
                .with_context(|| format!("Invalid TUNNELPROXY_DIAL_TIMEOUT: {}", timeout))?);
        }

        if let Some(log_level) = lookup("TUNNELPROXY_LOG_LEVEL") {
            config.logging.level = log_level;
        }

        config.validate()?;
        Ok(config)
    }
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.validate_server_config()
            .with_context(|| "Server configuration validation failed")?;

        if self.tunnel.network.is_empty() {
            bail!("tunnel.network must not be empty");
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            bail!("logging.level must be one of: {}", valid_log_levels.join(", "));
        }

        Ok(())
    }

    /// Validate server configuration
    fn validate_server_config(&self) -> Result<()> {
        if self.server.max_connections == Some(0) {
            bail!("max_connections must be greater than 0 when set");
        }

        if self.server.buffer_size < 1024 {
            bail!("buffer_size must be at least 1024 bytes");
        }

        if self.server.buffer_size > 1048576 {
            bail!("buffer_size cannot exceed 1MB");
        }

        if self.server.handshake_timeout.map_or(false, |t| t.is_zero()) {
            bail!("handshake_timeout must be greater than 0 when set");
        }

        if self.server.dial_timeout.map_or(false, |t| t.is_zero()) {
            bail!("dial_timeout must be greater than 0 when set");
        }

        Ok(())
    }

    /// Merge with CLI arguments
    pub fn merge_with_cli_args(
        &mut self,
        bind: Option<&str>,
        port: Option<u16>,
        log_level: Option<&str>,
        reply_on_failure: bool,
    ) {
        if let Some(bind_str) = bind {
            if let Ok(addr) = bind_str.parse::<SocketAddr>() {
                self.server.bind_addr = addr;
                tracing::info!("CLI override: bind address set to {}", addr);
            } else {
                tracing::warn!("Invalid bind address provided: {}", bind_str);
            }
        }

        if let Some(port) = port {
            self.server.bind_addr.set_port(port);
            tracing::info!("CLI override: port set to {}", port);
        }

        if let Some(level) = log_level {
            self.logging.level = level.to_string();
        }

        if reply_on_failure {
            self.server.reply_on_failure = true;
            tracing::info!("CLI override: SOCKS5 failure replies enabled");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.bind_addr.port(), 7788);
        assert!(config.server.handshake_timeout.is_none());
        assert!(config.server.max_connections.is_none());
        assert!(!config.server.reply_on_failure);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("TUNNELPROXY_BIND_ADDR", "0.0.0.0:1080"),
            ("TUNNELPROXY_DIAL_TIMEOUT", "15s"),
            ("TUNNELPROXY_MAX_CONNECTIONS", "64"),
            ("TUNNELPROXY_LOG_LEVEL", "debug"),
        ]
        .into_iter()
        .collect();

        let config = ConfigManager::load_from_vars(|name| vars.get(name).map(|v| v.to_string())).unwrap();
        assert_eq!(config.server.bind_addr, "0.0.0.0:1080".parse().unwrap());
        assert_eq!(config.server.dial_timeout, Some(Duration::from_secs(15)));
        assert_eq!(config.server.max_connections, Some(64));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_invalid_env_value_is_rejected() {
        let result = ConfigManager::load_from_vars(|name| {
            (name == "TUNNELPROXY_BUFFER_SIZE").then(|| "lots".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_bounds() {
        let mut config = Config::default();
        config.server.buffer_size = 512;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.server.dial_timeout = Some(Duration::ZERO);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.server.max_connections = Some(0);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = Config::default();
        config.merge_with_cli_args(Some("0.0.0.0:1080"), Some(9050), None, true);
        assert_eq!(config.server.bind_addr, "0.0.0.0:9050".parse().unwrap());
        assert!(config.server.reply_on_failure);

        // Unparseable bind address leaves the previous value alone
        config.merge_with_cli_args(Some("not-an-addr"), None, Some("warn"), false);
        assert_eq!(config.server.bind_addr.port(), 9050);
        assert_eq!(config.logging.level, "warn");
        assert!(config.server.reply_on_failure);
    }
}
