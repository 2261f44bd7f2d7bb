//! Direct TCP dialer

use super::{BoxedStream, TunnelDialer};
use async_trait::async_trait;
use std::io;
use tokio::net::TcpStream;
use tracing::{debug, warn};

/// Dialer that connects straight from this host with tokio.
///
/// Stands in for a real tunnel when the proxy runs without one. Host names
/// are resolved by tokio and each resolved address is tried in turn.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectDialer;

impl DirectDialer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TunnelDialer for DirectDialer {
    async fn open(&self, network: &str, address: &str) -> io::Result<BoxedStream> {
        if network != "tcp" {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("unsupported network: {}", network),
            ));
        }

        let stream = TcpStream::connect(address).await.map_err(|e| {
            warn!("Direct dial to {} failed: {}", address, e);
            e
        })?;
        // Not fatal if the socket refuses it
        if let Err(e) = stream.set_nodelay(true) {
            debug!("Failed to set TCP_NODELAY for {}: {}", address, e);
        }

        debug!("Connected directly to {}", address);
        Ok(Box::new(stream))
    }
}
