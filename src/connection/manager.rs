//! Proxy Server Implementation

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use super::ClientSession;
use crate::config::ProxyConfig;

/// Accepts client connections and runs one session task per client
pub struct ProxyServer {
    config: Arc<ProxyConfig>,
    local_addr: std::sync::Mutex<Option<SocketAddr>>,
    active_connections: Arc<AtomicUsize>,
    total_connections: Arc<AtomicUsize>,
    next_connection_id: AtomicUsize,
    shutdown_flag: Arc<AtomicBool>,
    /// Stops the accept loop
    shutdown_tx: broadcast::Sender<()>,
    /// Drops every session still running
    force_close_tx: broadcast::Sender<()>,
}

/// Decrements the active count when a session task ends
struct ActiveConnectionGuard(Arc<AtomicUsize>);

impl Drop for ActiveConnectionGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

impl ProxyServer {
    /// Create a new ProxyServer
    pub fn new(config: ProxyConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let (force_close_tx, _) = broadcast::channel(1);

        Self {
            config: Arc::new(config),
            local_addr: std::sync::Mutex::new(None),
            active_connections: Arc::new(AtomicUsize::new(0)),
            total_connections: Arc::new(AtomicUsize::new(0)),
            next_connection_id: AtomicUsize::new(1),
            shutdown_flag: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
            force_close_tx,
        }
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Bind the configured listen address and serve until shutdown
    pub async fn run(&self) -> Result<()> {
        let listen_addr = self.config.listen_addr;
        info!("Binding TCP listener to {}", listen_addr);
        let listener = TcpListener::bind(listen_addr)
            .await
            .with_context(|| format!("Failed to bind {}", listen_addr))?;

        self.serve(listener).await
    }

    /// Serve clients from an already bound listener until shutdown
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let local_addr = listener.local_addr().context("Failed to read listener address")?;
        if let Ok(mut slot) = self.local_addr.lock() {
            *slot = Some(local_addr);
        }
        info!("SOCKS5 proxy listening on {}", local_addr);

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            if self.shutdown_flag.load(Ordering::Relaxed) {
                info!("Shutdown flag set, stopping connection acceptance");
                break;
            }

            tokio::select! {
                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, addr)) => self.spawn_session(stream, addr),
                        Err(e) => {
                            error!("Error accepting connection: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Received shutdown signal, stopping connection acceptance");
                    self.shutdown_flag.store(true, Ordering::Relaxed);
                    break;
                }
            }
        }

        info!("Connection acceptance loop stopped");
        Ok(())
    }

    fn spawn_session(&self, stream: tokio::net::TcpStream, addr: SocketAddr) {
        debug!("Accepted connection from {}", addr);

        if let Some(limit) = self.config.max_connections {
            if self.active_connections.load(Ordering::Relaxed) >= limit {
                warn!("Connection limit {} reached, rejecting connection from {}", limit, addr);
                return;
            }
        }

        let connection_id = format!("conn_{}", self.next_connection_id.fetch_add(1, Ordering::Relaxed));
        self.active_connections.fetch_add(1, Ordering::Relaxed);
        self.total_connections.fetch_add(1, Ordering::Relaxed);

        let guard = ActiveConnectionGuard(Arc::clone(&self.active_connections));
        let config = Arc::clone(&self.config);
        let mut force_close_rx = self.force_close_tx.subscribe();

        tokio::spawn(async move {
            let _guard = guard;
            let start_time = Instant::now();
            let session = ClientSession::new(connection_id.clone(), addr.to_string(), stream);

            tokio::select! {
                result = session.run(&config) => {
                    if let Err(e) = result {
                        debug!("Connection {} ended with {:?} error: {}", connection_id, e.kind(), e);
                    }
                }
                _ = force_close_rx.recv() => {
                    info!("Connection {} force-closed at shutdown", connection_id);
                }
            }

            info!("Connection {} from {} closed after {:?}", connection_id, addr, start_time.elapsed());
        });
    }

    /// Address the listener is bound to, once serving
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr.lock().ok().and_then(|slot| *slot)
    }

    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::Relaxed)
    }

    pub fn total_connections(&self) -> usize {
        self.total_connections.load(Ordering::Relaxed)
    }

    /// Stop accepting new clients. Running sessions are left alone.
    pub fn initiate_shutdown(&self) {
        info!("Initiating server shutdown");
        self.shutdown_flag.store(true, Ordering::Relaxed);
        // No receivers just means the accept loop is not running
        let _ = self.shutdown_tx.send(());
    }

    /// Drop every session that is still running
    pub fn force_close_connections(&self) {
        let remaining = self.active_connections();
        if remaining > 0 {
            warn!("Force-closing {} active connections", remaining);
        }
        let _ = self.force_close_tx.send(());
    }

    /// Wait for active sessions to finish, up to `limit`
    pub async fn wait_for_connections_to_close(&self, limit: Duration) -> Result<()> {
        let start_time = Instant::now();
        let mut last_count = self.active_connections();
        info!("Waiting for {} active connections to close (timeout: {:?})", last_count, limit);

        while last_count > 0 && start_time.elapsed() < limit {
            tokio::time::sleep(Duration::from_millis(50)).await;
            let current = self.active_connections();
            if current != last_count {
                debug!("Active connections: {} -> {}", last_count, current);
                last_count = current;
            }
        }

        if last_count == 0 {
            info!("All connections closed in {:?}", start_time.elapsed());
            Ok(())
        } else {
            anyhow::bail!("{} connections still active after {:?}", last_count, limit)
        }
    }
}
