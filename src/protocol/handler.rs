//! SOCKS5 Protocol Handler

use super::{ConnectRequest, Socks5Reply, TargetAddr};
use crate::error::{ProxyError, Result};
use crate::protocol::constants::*;
use std::net::Ipv4Addr;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

/// SOCKS5 protocol handler for client connections
pub struct Socks5Handler<S> {
    stream: S,
}

impl<S> Socks5Handler<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Create a new SOCKS5 handler for the given stream
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    /// Handle the method negotiation.
    ///
    /// Consumes `VER NMETHODS METHODS...` and always selects "no
    /// authentication required", whatever the client offered.
    pub async fn handle_handshake(&mut self) -> Result<()> {
        let mut header = [0u8; 2];
        self.stream
            .read_exact(&mut header)
            .await
            .map_err(|e| ProxyError::short_read("greeting header", e))?;

        let version = header[0];
        let n_methods = header[1] as usize;

        if version != SOCKS5_VERSION {
            return Err(ProxyError::protocol(format!("unsupported SOCKS version: {}", version)));
        }

        let mut methods = vec![0u8; n_methods];
        self.stream
            .read_exact(&mut methods)
            .await
            .map_err(|e| ProxyError::short_read("auth methods", e))?;
        debug!("Client offered {} auth methods: {:?}", n_methods, methods);

        self.stream.write_all(&[SOCKS5_VERSION, SOCKS5_AUTH_NONE]).await?;
        Ok(())
    }

    /// Read the CONNECT request that follows a successful negotiation.
    ///
    /// Domain names must be valid UTF-8 because dialers take `&str`
    /// addresses. Other SOCKS5 servers forward the raw bytes; here a
    /// non-UTF-8 name is rejected as a protocol error before any dial.
    pub async fn read_connect_request(&mut self) -> Result<ConnectRequest> {
        // VER CMD RSV ATYP
        let mut header = [0u8; 4];
        self.stream
            .read_exact(&mut header)
            .await
            .map_err(|e| ProxyError::short_read("request header", e))?;

        let version = header[0];
        let command = header[1];
        let address_type = header[3];

        if version != SOCKS5_VERSION {
            return Err(ProxyError::protocol(format!(
                "invalid SOCKS version in request: {}",
                version
            )));
        }

        if command != SOCKS5_CMD_CONNECT {
            return Err(ProxyError::Command(command));
        }

        let addr = match address_type {
            SOCKS5_ADDR_IPV4 => {
                let mut addr_bytes = [0u8; 4];
                self.stream
                    .read_exact(&mut addr_bytes)
                    .await
                    .map_err(|e| ProxyError::short_read("IPv4 address", e))?;
                TargetAddr::Ipv4(Ipv4Addr::from(addr_bytes))
            }
            SOCKS5_ADDR_DOMAIN => {
                let mut len_buf = [0u8; 1];
                self.stream
                    .read_exact(&mut len_buf)
                    .await
                    .map_err(|e| ProxyError::short_read("domain length", e))?;

                let mut domain_bytes = vec![0u8; len_buf[0] as usize];
                self.stream
                    .read_exact(&mut domain_bytes)
                    .await
                    .map_err(|e| ProxyError::short_read("domain name", e))?;

                let domain = String::from_utf8(domain_bytes).map_err(|e| {
                    ProxyError::protocol(format!("invalid UTF-8 in domain name: {}", e))
                })?;
                TargetAddr::Domain(domain)
            }
            SOCKS5_ADDR_IPV6 => {
                return Err(ProxyError::unsupported("IPv6 destination addresses"));
            }
            other => return Err(ProxyError::AddressType(other)),
        };

        let mut port_bytes = [0u8; 2];
        self.stream
            .read_exact(&mut port_bytes)
            .await
            .map_err(|e| ProxyError::short_read("port", e))?;
        let port = u16::from_be_bytes(port_bytes);

        Ok(ConnectRequest::new(addr, port))
    }

    /// Send a CONNECT reply to the client
    pub async fn send_reply(&mut self, reply: Socks5Reply) -> Result<()> {
        self.stream.write_all(&reply.encode()).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Get the underlying stream back for relaying
    pub fn into_stream(self) -> S {
        self.stream
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn test_handshake_ignores_offered_methods() {
        // Client offers only username/password; we still pick no-auth
        let mock = Builder::new()
            .read(&[0x05, 0x01, 0x02])
            .write(&[0x05, 0x00])
            .build();

        let mut handler = Socks5Handler::new(mock);
        handler.handle_handshake().await.unwrap();
    }

    #[tokio::test]
    async fn test_handshake_rejects_socks4() {
        let mock = Builder::new().read(&[0x04, 0x01]).build();

        let mut handler = Socks5Handler::new(mock);
        let err = handler.handle_handshake().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[tokio::test]
    async fn test_domain_request_with_zero_length() {
        let mock = Builder::new()
            .read(&[0x05, 0x01, 0x00, 0x03, 0x00, 0x00, 0x50])
            .build();

        let mut handler = Socks5Handler::new(mock);
        let request = handler.read_connect_request().await.unwrap();
        assert_eq!(request.addr, TargetAddr::Domain(String::new()));
        assert_eq!(request.dial_target(), ":80");
    }

    #[tokio::test]
    async fn test_unknown_address_type() {
        let mock = Builder::new().read(&[0x05, 0x01, 0x00, 0x07]).build();

        let mut handler = Socks5Handler::new(mock);
        let err = handler.read_connect_request().await.unwrap_err();
        assert!(matches!(err, ProxyError::AddressType(0x07)));
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }
}
