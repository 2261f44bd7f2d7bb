//! Connection Handling Module
//! 
//! Accepts client connections and drives each one through its SOCKS5 session.

pub mod manager;
pub mod session;

pub use manager::ProxyServer;
pub use session::ClientSession;
