//! Client Session
//!
//! Drives one client connection through
//! `Greeting -> Negotiated -> RequestParsed -> Relaying -> Closed`.
//! Any failure jumps straight to `Closed`; by default no SOCKS5 failure reply
//! is sent and the connection is simply dropped.

use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use crate::config::ProxyConfig;
use crate::dialer::BoxedStream;
use crate::error::{ProxyError, Result};
use crate::protocol::{ConnectRequest, SessionPhase, Socks5Handler, Socks5Reply};
use crate::relay::{ConnectionStats, RelayEngine};

/// One accepted client connection
pub struct ClientSession<S> {
    connection_id: String,
    peer: String,
    handler: Socks5Handler<S>,
    phase: SessionPhase,
}

impl<S> ClientSession<S>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    pub fn new(connection_id: impl Into<String>, peer: impl Into<String>, stream: S) -> Self {
        Self {
            connection_id: connection_id.into(),
            peer: peer.into(),
            handler: Socks5Handler::new(stream),
            phase: SessionPhase::Greeting,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    fn advance(&mut self, next: SessionPhase) {
        debug!("Session {} {} -> {}", self.connection_id, self.phase, next);
        self.phase = next;
    }

    /// Run the session to completion.
    ///
    /// The client stream, and the destination stream once dialed, are
    /// dropped on every return path.
    #[instrument(skip(self, config), fields(connection_id = %self.connection_id, peer = %self.peer))]
    pub async fn run(mut self, config: &ProxyConfig) -> Result<ConnectionStats> {
        let (destination, target) = match self.establish(config).await {
            Ok(established) => established,
            Err(e) => {
                self.reject(config, &e).await;
                self.advance(SessionPhase::Closed);
                return Err(e);
            }
        };

        self.advance(SessionPhase::Relaying);
        let ClientSession { connection_id, peer, handler, .. } = self;

        let engine = RelayEngine::with_buffer_size(config.buffer_size);
        let result = engine.relay(handler.into_stream(), destination, &peer, &target).await;

        match &result {
            Ok(stats) => info!(
                "Connection {} relay to {} completed: {} bytes up, {} bytes down in {:?}",
                connection_id, target, stats.bytes_up, stats.bytes_down,
                Duration::from_millis(stats.duration_ms)
            ),
            Err(e) => warn!("Connection {} relay to {} failed: {}", connection_id, target, e),
        }
        debug!("Session {} {} -> {}", connection_id, SessionPhase::Relaying, SessionPhase::Closed);
        result
    }

    /// Negotiate, parse the request, dial, and acknowledge the client
    async fn establish(&mut self, config: &ProxyConfig) -> Result<(BoxedStream, String)> {
        let request = match config.handshake_timeout {
            Some(limit) => timeout(limit, self.negotiate())
                .await
                .map_err(|_| ProxyError::protocol(format!("handshake timed out after {:?}", limit)))??,
            None => self.negotiate().await?,
        };

        let target = request.dial_target();
        let destination = dial(config, &target).await?;

        self.handler.send_reply(Socks5Reply::success()).await?;
        info!("Connection {} from {} connected to {}", self.connection_id, self.peer, target);
        Ok((destination, target))
    }

    async fn negotiate(&mut self) -> Result<ConnectRequest> {
        self.handler.handle_handshake().await?;
        self.advance(SessionPhase::Negotiated);

        let request = self.handler.read_connect_request().await?;
        debug!("CONNECT request from {}: {:?}", self.peer, request);
        self.advance(SessionPhase::RequestParsed);
        Ok(request)
    }

    /// Optionally tell the client why before the connection is dropped
    async fn reject(&mut self, config: &ProxyConfig, err: &ProxyError) {
        warn!("Connection {} from {} failed in phase {}: {}", self.connection_id, self.peer, self.phase, err);

        if !config.reply_on_failure || self.phase == SessionPhase::Greeting {
            return;
        }
        if let Some(reply) = Socks5Reply::for_error(err) {
            if let Err(e) = self.handler.send_reply(reply).await {
                debug!("Failed to send failure reply to {}: {}", self.peer, e);
            }
        }
    }
}

async fn dial(config: &ProxyConfig, target: &str) -> Result<BoxedStream> {
    debug!("Dialing {} over {} through tunnel", target, config.network);

    let opened = match config.dial_timeout {
        Some(limit) => match timeout(limit, config.dialer.open(&config.network, target)).await {
            Ok(result) => result,
            Err(_) => Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("dial timed out after {:?}", limit),
            )),
        },
        None => config.dialer.open(&config.network, target).await,
    };

    opened.map_err(|source| ProxyError::Dial {
        target: target.to_string(),
        source,
    })
}
