//! Network endpoint type shared by the video and command paths.

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4, ToSocketAddrs};

/// A network endpoint (IP address + port).
///
/// Wrapper around [`SocketAddr`] so the link's addressing stays in one type
/// whether it came from a literal, a config file or a hostname lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Endpoint(SocketAddr);

impl Endpoint {
    /// Creates a new endpoint from an IP address and port.
    #[must_use]
    pub const fn new(addr: IpAddr, port: u16) -> Self {
        Self(SocketAddr::new(addr, port))
    }

    /// Creates a new IPv4 endpoint.
    #[must_use]
    pub const fn new_v4(a: u8, b: u8, c: u8, d: u8, port: u16) -> Self {
        Self(SocketAddr::V4(SocketAddrV4::new(
            Ipv4Addr::new(a, b, c, d),
            port,
        )))
    }

    /// Creates an endpoint bound to all interfaces (0.0.0.0) on the given port.
    #[must_use]
    pub const fn any(port: u16) -> Self {
        Self::new_v4(0, 0, 0, 0, port)
    }

    /// Creates a localhost endpoint on the given port.
    #[must_use]
    pub const fn localhost(port: u16) -> Self {
        Self::new_v4(127, 0, 0, 1, port)
    }

    /// Resolves `host` (an IP literal or a hostname) and pairs it with `port`.
    ///
    /// The first IPv4 result wins, falling back to whatever the resolver
    /// returned first.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails or yields no addresses.
    pub fn resolve(host: &str, port: u16) -> io::Result<Self> {
        let addrs: Vec<SocketAddr> = (host, port).to_socket_addrs()?.collect();
        addrs
            .iter()
            .find(|a| a.is_ipv4())
            .or_else(|| addrs.first())
            .copied()
            .map(Self)
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no address found for {host}"),
                )
            })
    }

    /// Returns the same host with a different port.
    #[must_use]
    pub const fn with_port(&self, port: u16) -> Self {
        Self::new(self.0.ip(), port)
    }

    /// Returns the IP address.
    #[must_use]
    pub const fn ip(&self) -> IpAddr {
        self.0.ip()
    }

    /// Returns the port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.0.port()
    }

    /// Returns the underlying [`SocketAddr`].
    #[must_use]
    pub const fn as_socket_addr(&self) -> SocketAddr {
        self.0
    }
}

impl From<SocketAddr> for Endpoint {
    fn from(addr: SocketAddr) -> Self {
        Self(addr)
    }
}

impl From<Endpoint> for SocketAddr {
    fn from(ep: Endpoint) -> Self {
        ep.0
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_any() {
        let ep = Endpoint::any(55556);
        assert_eq!(ep.ip(), IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(ep.port(), 55556);
    }

    #[test]
    fn endpoint_with_port_keeps_host() {
        let vehicle = Endpoint::new_v4(192, 168, 4, 1, 55555);
        let command = vehicle.with_port(3197);
        assert_eq!(command.ip(), vehicle.ip());
        assert_eq!(command.port(), 3197);
    }

    #[test]
    fn resolve_ip_literal() {
        let ep = Endpoint::resolve("10.0.0.7", 3197).unwrap();
        assert_eq!(ep, Endpoint::new_v4(10, 0, 0, 7, 3197));
    }

    #[test]
    fn resolve_localhost_name() {
        let ep = Endpoint::resolve("localhost", 55555).unwrap();
        assert!(ep.ip().is_loopback());
        assert_eq!(ep.port(), 55555);
    }

    #[test]
    fn endpoint_display() {
        let ep = Endpoint::new_v4(127, 0, 0, 1, 3197);
        assert_eq!(format!("{ep}"), "127.0.0.1:3197");
    }
}
