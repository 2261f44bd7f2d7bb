//! tunnelproxy - SOCKS5 proxy server dialing through a tunnel

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tunnelproxy::{config::ConfigManager, DirectDialer, ProxyConfig, ProxyServer, ShutdownCoordinator};

/// CLI arguments for tunnelproxy
#[derive(Parser, Debug)]
#[command(name = "tunnelproxy")]
#[command(about = "SOCKS5 proxy server dialing through a tunnel")]
#[command(version)]
#[command(long_about = "
SOCKS5 proxy server (no-auth, CONNECT only) whose outbound connections
are opened through a tunnel dialer.

Configuration priority (highest to lowest):
1. Command-line arguments
2. Configuration file
3. Environment variables
4. Built-in defaults

Environment variables:
  TUNNELPROXY_BIND_ADDR        - Bind address (e.g., 0.0.0.0:7788)
  TUNNELPROXY_MAX_CONNECTIONS  - Maximum concurrent connections
  TUNNELPROXY_BUFFER_SIZE      - Relay buffer size in bytes
  TUNNELPROXY_DIAL_TIMEOUT     - Dial timeout (e.g., 10s)
  TUNNELPROXY_LOG_LEVEL        - Log level (trace, debug, info, warn, error)
")]
pub struct CliArgs {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml", help = "Path to configuration file")]
    pub config: PathBuf,

    /// Bind address (overrides config file)
    #[arg(short, long, help = "Bind address (e.g., 0.0.0.0:7788)")]
    pub bind: Option<String>,

    /// Port to bind to (overrides config file)
    #[arg(short, long, help = "Port to bind to")]
    pub port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, help = "Log level")]
    pub log_level: Option<String>,

    /// Enable verbose logging (sets log level to debug)
    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,

    /// Send SOCKS5 failure replies instead of just closing
    #[arg(long, help = "Send SOCKS5 failure replies on dial or request errors")]
    pub reply_on_failure: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration and exit")]
    pub validate_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    // Load configuration with priority: CLI args > config file > environment > defaults
    let mut config = if args.config.exists() {
        ConfigManager::load_from_file(&args.config)?
    } else {
        ConfigManager::load_from_env()?
    };

    config.merge_with_cli_args(
        args.bind.as_deref(),
        args.port,
        args.log_level.as_deref(),
        args.reply_on_failure,
    );

    config
        .validate()
        .context("Final configuration validation failed")?;

    init_tracing(&args, &config.logging.level)?;

    info!("Starting tunnelproxy v{}", env!("CARGO_PKG_VERSION"));

    if args.validate_config {
        info!("Configuration is valid");
        info!("  Bind address: {}", config.server.bind_addr);
        match config.server.max_connections {
            Some(limit) => info!("  Max connections: {}", limit),
            None => info!("  Max connections: unlimited"),
        }
        info!("  Buffer size: {} bytes", config.server.buffer_size);
        info!("  Handshake timeout: {:?}", config.server.handshake_timeout);
        info!("  Dial timeout: {:?}", config.server.dial_timeout);
        info!("  Failure replies: {}", if config.server.reply_on_failure { "enabled" } else { "disabled" });
        return Ok(());
    }

    let shutdown_coordinator = ShutdownCoordinator::new(config.server.shutdown_timeout);

    let proxy_config = ProxyConfig::from_config(&config, Arc::new(DirectDialer::new()));
    let server = Arc::new(ProxyServer::new(proxy_config));

    let mut server_handle = {
        let server = Arc::clone(&server);
        tokio::spawn(async move {
            if let Err(e) = server.run().await {
                error!("Server error: {:#}", e);
            }
        })
    };

    info!("Press Ctrl+C or send SIGTERM/SIGINT to shutdown gracefully");

    let server_exited = tokio::select! {
        result = shutdown_coordinator.listen_for_signals() => {
            if let Err(e) = result {
                error!("Error setting up signal handlers: {}", e);
            }
            false
        }
        result = &mut server_handle => {
            if let Err(e) = result {
                error!("Server task failed: {}", e);
            }
            true
        }
    };

    info!("Initiating graceful shutdown...");
    shutdown_coordinator.shutdown_server(&server).await?;

    if !server_exited {
        if let Err(e) = server_handle.await {
            if !e.is_cancelled() {
                error!("Server task failed: {}", e);
            }
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(args: &CliArgs, configured_level: &str) -> Result<()> {
    let log_level = if args.verbose { "debug" } else { configured_level };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(true),
        )
        .with(env_filter)
        .init();

    Ok(())
}
