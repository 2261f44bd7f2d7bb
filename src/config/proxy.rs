//! Runtime proxy configuration

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use super::Config;
use crate::dialer::TunnelDialer;
use crate::relay::engine::DEFAULT_BUFFER_SIZE;

/// Everything a [`ProxyServer`](crate::ProxyServer) needs, passed in at
/// construction time.
#[derive(Clone)]
pub struct ProxyConfig {
    pub dialer: Arc<dyn TunnelDialer>,
    pub listen_addr: SocketAddr,
    pub network: String,
    pub buffer_size: usize,
    pub max_connections: Option<usize>,
    pub handshake_timeout: Option<Duration>,
    pub dial_timeout: Option<Duration>,
    pub reply_on_failure: bool,
}

impl ProxyConfig {
    /// Minimal configuration: a dialer and a listen address
    pub fn new(dialer: Arc<dyn TunnelDialer>, listen_addr: SocketAddr) -> Self {
        Self {
            dialer,
            listen_addr,
            network: "tcp".to_string(),
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_connections: None,
            handshake_timeout: None,
            dial_timeout: None,
            reply_on_failure: false,
        }
    }

    /// Build from a loaded [`Config`]
    pub fn from_config(config: &Config, dialer: Arc<dyn TunnelDialer>) -> Self {
        Self {
            dialer,
            listen_addr: config.server.bind_addr,
            network: config.tunnel.network.clone(),
            buffer_size: config.server.buffer_size,
            max_connections: config.server.max_connections,
            handshake_timeout: config.server.handshake_timeout,
            dial_timeout: config.server.dial_timeout,
            reply_on_failure: config.server.reply_on_failure,
        }
    }
}

impl fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("listen_addr", &self.listen_addr)
            .field("network", &self.network)
            .field("buffer_size", &self.buffer_size)
            .field("max_connections", &self.max_connections)
            .field("handshake_timeout", &self.handshake_timeout)
            .field("dial_timeout", &self.dial_timeout)
            .field("reply_on_failure", &self.reply_on_failure)
            .finish_non_exhaustive()
    }
}
