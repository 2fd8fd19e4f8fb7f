//! Endpoint addressing: a (textual IPv4 address, port) pair.
//!
//! The wire header only ever carries a textual IPv4 address (never a
//! `SocketAddr`/IPv6 literal — see the Non-goals in the crate-level docs), so
//! `Endpoint` mirrors that restriction rather than wrapping `std::net::SocketAddr`.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// A (host, port) pair addressing a UDP/TCP peer.
///
/// The host is always stored and displayed as a dotted-quad IPv4 literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    address: Ipv4Addr,
    port: u16,
}

/// The designated "no endpoint" value: `("0.0.0.0", 0)`.
///
/// Used as the sentinel a caller passes for `response_address`/`response_port`
/// when it wants the header filled in with the transport's own fallback
/// address instead (see `netproto::codec::MessageCodec::fill_header`).
pub const NULL_CONNECTION: Endpoint = Endpoint {
    address: Ipv4Addr::UNSPECIFIED,
    port: 0,
};

impl Endpoint {
    #[must_use]
    pub const fn new(address: Ipv4Addr, port: u16) -> Self {
        Self { address, port }
    }

    /// Parse `"a.b.c.d:port"` into an endpoint.
    pub fn parse(s: &str) -> Result<Self, EndpointError> {
        s.parse()
    }

    #[must_use]
    pub const fn address(&self) -> Ipv4Addr {
        self.address
    }

    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Whether this endpoint is the null/sentinel endpoint.
    #[must_use]
    pub fn is_null(&self) -> bool {
        *self == NULL_CONNECTION
    }

    #[must_use]
    pub fn to_socket_addr(&self) -> std::net::SocketAddr {
        std::net::SocketAddr::from((self.address, self.port))
    }
}

impl From<std::net::SocketAddrV4> for Endpoint {
    fn from(addr: std::net::SocketAddrV4) -> Self {
        Self::new(*addr.ip(), addr.port())
    }
}

impl FromStr for Endpoint {
    type Err = EndpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| EndpointError::InvalidEndpoint(s.to_string()))?;
        let address = host
            .parse::<Ipv4Addr>()
            .map_err(|_| EndpointError::InvalidAddress(host.to_string()))?;
        let port = port
            .parse::<u16>()
            .map_err(|_| EndpointError::InvalidPort(port.to_string()))?;
        Ok(Self { address, port })
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}

/// Errors parsing or validating an [`Endpoint`].
#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    #[error("invalid endpoint: {0} (expected \"a.b.c.d:port\")")]
    InvalidEndpoint(String),

    #[error("invalid IPv4 address: {0}")]
    InvalidAddress(String),

    #[error("invalid port: {0}")]
    InvalidPort(String),
}
