//! SOCKS5 Protocol Types

use std::fmt;
use std::io;
use std::net::Ipv4Addr;
use crate::error::ProxyError;
use crate::protocol::constants::*;

/// Destination address carried by a CONNECT request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetAddr {
    Ipv4(Ipv4Addr),
    Domain(String),
}

impl TargetAddr {
    /// Get the address type code for this address
    pub fn address_type(&self) -> u8 {
        match self {
            TargetAddr::Ipv4(_) => SOCKS5_ADDR_IPV4,
            TargetAddr::Domain(_) => SOCKS5_ADDR_DOMAIN,
        }
    }
}

impl fmt::Display for TargetAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetAddr::Ipv4(ip) => write!(f, "{}", ip),
            TargetAddr::Domain(domain) => f.write_str(domain),
        }
    }
}

/// Parsed CONNECT request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    pub addr: TargetAddr,
    pub port: u16,
}

impl ConnectRequest {
    pub fn new(addr: TargetAddr, port: u16) -> Self {
        Self { addr, port }
    }

    /// The `host:port` string handed to the tunnel dialer
    pub fn dial_target(&self) -> String {
        format!("{}:{}", self.addr, self.port)
    }
}

/// Reply to a CONNECT request.
///
/// The bound address is always the IPv4 placeholder `0.0.0.0:0`; clients only
/// look at the reply code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Socks5Reply {
    pub reply_code: u8,
}

impl Socks5Reply {
    /// Create a success reply
    pub fn success() -> Self {
        Self { reply_code: SOCKS5_REPLY_SUCCESS }
    }

    /// Create a failure reply with the given code
    pub fn failure(reply_code: u8) -> Self {
        Self { reply_code }
    }

    /// Pick a failure reply for a tunnel dial error
    pub fn for_dial_error(err: &io::Error) -> Self {
        let code = match err.kind() {
            io::ErrorKind::ConnectionRefused => SOCKS5_REPLY_CONNECTION_REFUSED,
            io::ErrorKind::PermissionDenied => SOCKS5_REPLY_CONNECTION_NOT_ALLOWED,
            io::ErrorKind::Unsupported => SOCKS5_REPLY_GENERAL_FAILURE,
            _ if err.to_string().to_lowercase().contains("network is unreachable") => {
                SOCKS5_REPLY_NETWORK_UNREACHABLE
            }
            _ => SOCKS5_REPLY_HOST_UNREACHABLE,
        };
        Self::failure(code)
    }

    /// Failure reply matching a session error, if one should be sent at all.
    ///
    /// Errors raised before a request was parsed (bad greeting, truncated
    /// request) get no reply.
    pub fn for_error(err: &ProxyError) -> Option<Self> {
        match err {
            ProxyError::Dial { source, .. } => Some(Self::for_dial_error(source)),
            ProxyError::Command(_) => Some(Self::failure(SOCKS5_REPLY_COMMAND_NOT_SUPPORTED)),
            ProxyError::UnsupportedFeature(_) | ProxyError::AddressType(_) => {
                Some(Self::failure(SOCKS5_REPLY_ADDRESS_TYPE_NOT_SUPPORTED))
            }
            _ => None,
        }
    }

    /// Encode as `VER REP RSV ATYP BND.ADDR BND.PORT`
    pub fn encode(&self) -> [u8; SOCKS5_IPV4_REPLY_LEN] {
        [
            SOCKS5_VERSION,
            self.reply_code,
            SOCKS5_RESERVED,
            SOCKS5_ADDR_IPV4,
            0, 0, 0, 0,
            0, 0,
        ]
    }
}

/// Protocol phase of a client session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Greeting,
    Negotiated,
    RequestParsed,
    Relaying,
    Closed,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionPhase::Greeting => "greeting",
            SessionPhase::Negotiated => "negotiated",
            SessionPhase::RequestParsed => "request-parsed",
            SessionPhase::Relaying => "relaying",
            SessionPhase::Closed => "closed",
        };
        f.write_str(name)
    }
}
