//! Graceful Shutdown Handling
//!
//! Waits for SIGTERM/SIGINT, then stops the proxy server from accepting and
//! gives active sessions a bounded amount of time to finish before they are
//! force-closed.

use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};
use anyhow::Result;

use crate::connection::ProxyServer;

/// How long force-closed sessions get to unwind
const FORCE_CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Shutdown coordinator that manages graceful shutdown process
pub struct ShutdownCoordinator {
    /// How long active sessions may keep running after shutdown starts
    timeout: Duration,
}

impl ShutdownCoordinator {
    /// Create a new shutdown coordinator
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Start listening for shutdown signals (SIGTERM, SIGINT)
    pub async fn listen_for_signals(&self) -> Result<()> {
        info!("Starting shutdown signal listener");

        #[cfg(unix)]
        {
            let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
            let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())?;

            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, initiating graceful shutdown");
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, initiating graceful shutdown");
                }
            }
        }

        #[cfg(windows)]
        {
            signal::ctrl_c().await?;
            info!("Received Ctrl+C, initiating graceful shutdown");
        }

        Ok(())
    }

    /// Stop accepting, let running sessions drain, then force-close the rest
    pub async fn shutdown_server(&self, server: &ProxyServer) -> Result<()> {
        server.initiate_shutdown();

        if let Err(e) = server.wait_for_connections_to_close(self.timeout).await {
            warn!("Shutdown timeout reached: {}", e);
            server.force_close_connections();

            if let Err(e) = server.wait_for_connections_to_close(FORCE_CLOSE_GRACE).await {
                warn!("Connections did not unwind after force close: {}", e);
            }
        }
        Ok(())
    }
}
