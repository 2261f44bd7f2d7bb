//! tunnelproxy Library
//! 
//! A minimal SOCKS5 proxy whose outbound connections are opened through a
//! tunnel rather than the local network stack. Clients speak SOCKS5
//! (no-auth, CONNECT, IPv4 or domain destinations); each destination is
//! dialed with a [`TunnelDialer`] and bytes are relayed until either side
//! closes.
//!
//! The `tunnelproxy` binary ships with [`DirectDialer`], which connects from
//! the local host. Embedders supply their own [`TunnelDialer`] to route
//! outbound traffic through a real tunnel.

pub mod config;
pub mod connection;
pub mod dialer;
pub mod error;
pub mod protocol;
pub mod relay;
pub mod shutdown;

pub use config::{Config, ProxyConfig};
pub use connection::{ClientSession, ProxyServer};
pub use dialer::{BoxedStream, DirectDialer, DuplexStream, TunnelDialer};
pub use error::{ErrorKind, ProxyError, Result};
pub use shutdown::ShutdownCoordinator;
