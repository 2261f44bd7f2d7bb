//! Relay Session

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use serde::{Deserialize, Serialize};
use tracing::{info, debug};

/// How one copy direction ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DirectionEnd {
    /// The source reached end of stream
    Eof,
    /// The other direction finished first and closed the pair
    Closed,
    /// An I/O error stopped the copy
    Failed,
}

/// Represents an active relay session
#[derive(Debug)]
pub struct RelaySession {
    pub session_id: String,
    pub client: String,
    pub target: String,
    pub start_time: Instant,
    pub bytes_up: AtomicU64,
    pub bytes_down: AtomicU64,
}

/// Statistics for a completed session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionStats {
    pub session_id: String,
    pub client: String,
    pub target: String,
    pub duration_ms: u64,
    pub bytes_up: u64,
    pub bytes_down: u64,
    pub total_bytes: u64,
    pub upstream_end: DirectionEnd,
    pub downstream_end: DirectionEnd,
}

impl RelaySession {
    /// Create a new relay session
    pub fn new(session_id: String, client: impl Into<String>, target: impl Into<String>) -> Self {
        let client = client.into();
        let target = target.into();
        debug!("Creating new relay session: {} ({} -> {})", session_id, client, target);

        Self {
            session_id,
            client,
            target,
            start_time: Instant::now(),
            bytes_up: AtomicU64::new(0),
            bytes_down: AtomicU64::new(0),
        }
    }

    /// Get bytes transferred upstream (client to target)
    pub fn bytes_up(&self) -> u64 {
        self.bytes_up.load(Ordering::Relaxed)
    }

    /// Get bytes transferred downstream (target to client)
    pub fn bytes_down(&self) -> u64 {
        self.bytes_down.load(Ordering::Relaxed)
    }

    pub fn total_bytes(&self) -> u64 {
        self.bytes_up() + self.bytes_down()
    }

    pub fn duration(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }

    pub fn add_bytes_up(&self, bytes: u64) {
        self.bytes_up.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn add_bytes_down(&self, bytes: u64) {
        self.bytes_down.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Generate connection statistics
    pub fn to_stats(&self, upstream_end: DirectionEnd, downstream_end: DirectionEnd) -> ConnectionStats {
        ConnectionStats {
            session_id: self.session_id.clone(),
            client: self.client.clone(),
            target: self.target.clone(),
            duration_ms: self.duration().as_millis() as u64,
            bytes_up: self.bytes_up(),
            bytes_down: self.bytes_down(),
            total_bytes: self.total_bytes(),
            upstream_end,
            downstream_end,
        }
    }

    /// Log session statistics
    pub fn log_stats(&self) {
        info!(
            session_id = %self.session_id,
            client = %self.client,
            target = %self.target,
            duration_ms = self.duration().as_millis() as u64,
            bytes_up = self.bytes_up(),
            bytes_down = self.bytes_down(),
            total_bytes = self.total_bytes(),
            "Relay session completed"
        );
    }
}
