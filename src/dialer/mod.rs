//! Tunnel Dialer
//!
//! The capability used to open destination streams. Sessions only ever dial
//! through a [`TunnelDialer`]; [`DirectDialer`] is the default stand-in and
//! connects from the local host.

pub mod direct;

use async_trait::async_trait;
use std::io;
use tokio::io::{AsyncRead, AsyncWrite};

pub use direct::DirectDialer;

/// Any bidirectional byte stream usable as one side of a relay
pub trait DuplexStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T> DuplexStream for T where T: AsyncRead + AsyncWrite + Send + Unpin {}

/// Type-erased destination stream returned by a dialer
pub type BoxedStream = Box<dyn DuplexStream>;

/// Opens named destinations over an established tunnel.
///
/// Implementations are shared by every client session and must tolerate
/// concurrent calls.
#[async_trait]
pub trait TunnelDialer: Send + Sync {
    /// Open `address` (`host:port`) on the given network kind, e.g. `"tcp"`
    async fn open(&self, network: &str, address: &str) -> io::Result<BoxedStream>;
}
