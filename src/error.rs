//! Error types for SOCKS5 sessions.

use std::io;
use thiserror::Error;

/// Result type alias for session operations.
pub type Result<T> = std::result::Result<T, ProxyError>;

/// Errors that terminate a single client session.
#[derive(Error, Debug)]
pub enum ProxyError {
    /// Malformed handshake or request bytes, including short reads
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Request carries a command other than CONNECT
    #[error("protocol error: unsupported command {0:#04x}")]
    Command(u8),

    /// Request carries an address type outside the SOCKS5 set
    #[error("protocol error: unknown address type {0:#04x}")]
    AddressType(u8),

    /// Request uses a SOCKS5 feature this server does not implement
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),

    /// The tunnel could not reach the requested destination
    #[error("failed to dial {target} through tunnel: {source}")]
    Dial {
        target: String,
        #[source]
        source: io::Error,
    },

    /// Unexpected I/O failure while forwarding
    #[error("relay error: {0}")]
    Relay(#[source] io::Error),

    /// Failure writing a protocol reply to the client
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Category tag for a [`ProxyError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Protocol,
    UnsupportedFeature,
    Dial,
    Relay,
    Io,
}

impl ProxyError {
    pub fn protocol(msg: impl Into<String>) -> Self {
        ProxyError::Protocol(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        ProxyError::UnsupportedFeature(msg.into())
    }

    /// Map a failed read during negotiation. End of stream and every other
    /// read failure count as a protocol violation by the client.
    pub(crate) fn short_read(what: &str, err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            ProxyError::Protocol(format!("connection closed while reading {}", what))
        } else {
            ProxyError::Protocol(format!("failed to read {}: {}", what, err))
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ProxyError::Protocol(_)
            | ProxyError::Command(_)
            | ProxyError::AddressType(_) => ErrorKind::Protocol,
            ProxyError::UnsupportedFeature(_) => ErrorKind::UnsupportedFeature,
            ProxyError::Dial { .. } => ErrorKind::Dial,
            ProxyError::Relay(_) => ErrorKind::Relay,
            ProxyError::Io(_) => ErrorKind::Io,
        }
    }
}
