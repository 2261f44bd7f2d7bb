//! Relay Engine

use std::io;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{ProxyError, Result};
use super::{ConnectionStats, DirectionEnd, RelayPair, RelaySession};

/// Default size of the per-direction copy buffer
pub const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Result of one copy loop
#[derive(Debug)]
pub enum CopyOutcome {
    /// Source reached end of stream
    Eof,
    /// Stopped because the pair was closed by the other direction
    Closed,
    /// Read or write failed
    Failed(io::Error),
}

impl CopyOutcome {
    pub fn end(&self) -> DirectionEnd {
        match self {
            CopyOutcome::Eof => DirectionEnd::Eof,
            CopyOutcome::Closed => DirectionEnd::Closed,
            CopyOutcome::Failed(_) => DirectionEnd::Failed,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Upstream,
    Downstream,
}

/// Closes the pair even if a copy task unwinds
struct ClosePairOnDrop(Arc<RelayPair>);

impl Drop for ClosePairOnDrop {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// Handles data relay between client and destination streams
#[derive(Debug, Clone)]
pub struct RelayEngine {
    buffer_size: usize,
}

impl RelayEngine {
    /// Create a new relay engine
    pub fn new() -> Self {
        Self::with_buffer_size(DEFAULT_BUFFER_SIZE)
    }

    /// Create a new relay engine with a custom copy buffer size
    pub fn with_buffer_size(buffer_size: usize) -> Self {
        Self {
            buffer_size: buffer_size.max(1),
        }
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Relay bytes between `client` and `target` until either side finishes.
    ///
    /// Each direction runs on its own task. The first direction to stop closes
    /// the pair, which stops the other one, and both streams are dropped
    /// before this returns. Ordinary peer closure is not an error.
    pub async fn relay<C, T>(
        &self,
        client: C,
        target: T,
        client_label: &str,
        target_label: &str,
    ) -> Result<ConnectionStats>
    where
        C: AsyncRead + AsyncWrite + Send + 'static,
        T: AsyncRead + AsyncWrite + Send + 'static,
    {
        let session = Arc::new(RelaySession::new(
            Uuid::new_v4().to_string(),
            client_label,
            target_label,
        ));
        info!("Starting bidirectional data relay for session {}", session.session_id);

        let (client_read, client_write) = tokio::io::split(client);
        let (target_read, target_write) = tokio::io::split(target);
        let pair = Arc::new(RelayPair::new());

        let upstream = tokio::spawn(copy_direction(
            client_read,
            target_write,
            Arc::clone(&pair),
            Arc::clone(&session),
            Direction::Upstream,
            self.buffer_size,
        ));
        let downstream = tokio::spawn(copy_direction(
            target_read,
            client_write,
            Arc::clone(&pair),
            Arc::clone(&session),
            Direction::Downstream,
            self.buffer_size,
        ));

        // Dropping this future (e.g. on shutdown) must stop both tasks
        let _cancel = ClosePairOnDrop(Arc::clone(&pair));
        let (upstream, downstream) = tokio::join!(upstream, downstream);
        let upstream = upstream.map_err(|e| ProxyError::Relay(io::Error::new(io::ErrorKind::Other, e)))?;
        let downstream = downstream.map_err(|e| ProxyError::Relay(io::Error::new(io::ErrorKind::Other, e)))?;

        session.log_stats();
        let stats = session.to_stats(upstream.end(), downstream.end());

        for (name, outcome) in [("upstream", upstream), ("downstream", downstream)] {
            if let CopyOutcome::Failed(e) = outcome {
                if is_peer_closure(&e) {
                    debug!("Session {} {} closed by peer: {}", session.session_id, name, e);
                } else {
                    warn!("Session {} {} failed: {}", session.session_id, name, e);
                    return Err(ProxyError::Relay(e));
                }
            }
        }

        Ok(stats)
    }
}

impl Default for RelayEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that just mean the other end went away
fn is_peer_closure(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof
    )
}

async fn copy_direction<R, W>(
    mut reader: R,
    mut writer: W,
    pair: Arc<RelayPair>,
    session: Arc<RelaySession>,
    direction: Direction,
    buffer_size: usize,
) -> CopyOutcome
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let _guard = ClosePairOnDrop(Arc::clone(&pair));
    let mut buf = vec![0u8; buffer_size];

    let outcome = loop {
        let n = tokio::select! {
            _ = pair.closed() => break CopyOutcome::Closed,
            result = reader.read(&mut buf) => match result {
                Ok(0) => break CopyOutcome::Eof,
                Ok(n) => n,
                Err(e) => break CopyOutcome::Failed(e),
            },
        };

        let written = tokio::select! {
            _ = pair.closed() => break CopyOutcome::Closed,
            result = async {
                writer.write_all(&buf[..n]).await?;
                writer.flush().await
            } => result,
        };
        if let Err(e) = written {
            break CopyOutcome::Failed(e);
        }

        match direction {
            Direction::Upstream => session.add_bytes_up(n as u64),
            Direction::Downstream => session.add_bytes_down(n as u64),
        }
    };

    debug!("Session {} {:?} finished: {:?}", session.session_id, direction, outcome);
    pair.close();
    // Peer may already be gone
    let _ = writer.shutdown().await;
    outcome
}
