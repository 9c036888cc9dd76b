//! Routing connections through the daemon's SOCKS listener
//!
//! Instead of patching process-wide socket functions, callers own a
//! [`NetStack`] (a dial capability plus an address lookup capability) and
//! [`bind`] swaps both for proxy-aware versions. The returned
//! [`BindingState`] restores the originals.

mod bind;
pub mod socks;

pub use bind::{
    bind, AddrFamily, AddrRecord, BindingState, Capabilities, Dialer, Lookup, NetStack,
    ProxySettings, SockType,
};

use std::fmt;
use std::net::{IpAddr, SocketAddr};

/// Local address of the SOCKS listener
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProxyEndpoint {
    pub host: IpAddr,
    pub port: u16,
}

impl ProxyEndpoint {
    pub fn new(host: IpAddr, port: u16) -> Self {
        Self { host, port }
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// `socks5://host:port`, suitable for generic proxy settings
    pub fn url(&self) -> String {
        format!("socks5://{}", self.addr())
    }
}

impl fmt::Display for ProxyEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.addr())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn test_url_format() {
        let endpoint = ProxyEndpoint::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 9150);
        assert_eq!(endpoint.url(), "socks5://127.0.0.1:9150");
        assert_eq!(endpoint.to_string(), "127.0.0.1:9150");
    }

    #[test]
    fn test_url_format_v6() {
        let endpoint = ProxyEndpoint::new(IpAddr::V6(Ipv6Addr::LOCALHOST), 9150);
        assert_eq!(endpoint.url(), "socks5://[::1]:9150");
    }
}
