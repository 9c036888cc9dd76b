//! Dial/lookup capabilities and proxy binding

use super::socks;
use super::ProxyEndpoint;
use crate::error::{Result, TorError};
use std::io;
use std::net::IpAddr;
use tokio::net::TcpStream;
use tracing::{debug, info};

/// IANA protocol number for TCP
const IPPROTO_TCP: u8 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrFamily {
    Inet,
    Inet6,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SockType {
    Stream,
}

/// One address lookup result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddrRecord {
    pub family: AddrFamily,
    pub socktype: SockType,
    pub protocol: u8,
    pub host: String,
    pub port: u16,
}

/// SOCKS proxy used by [`Dialer::Socks5`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProxySettings {
    pub endpoint: ProxyEndpoint,
    /// Hand hostnames to the proxy instead of resolving them locally
    pub remote_dns: bool,
}

/// How outbound TCP connections are made
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialer {
    Direct,
    Socks5(ProxySettings),
}

/// How hostnames are turned into connectable addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// Operating system resolver
    System,
    /// No lookup; the hostname comes back unchanged as a single record
    Passthrough,
}

/// A socket-creation plus address-resolution capability pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetStack {
    pub dialer: Dialer,
    pub lookup: Lookup,
}

impl Default for NetStack {
    fn default() -> Self {
        Self {
            dialer: Dialer::Direct,
            lookup: Lookup::System,
        }
    }
}

impl NetStack {
    /// Resolve `host:port` with the current lookup capability
    pub async fn lookup_host(&self, host: &str, port: u16) -> Result<Vec<AddrRecord>> {
        match self.lookup {
            Lookup::Passthrough => Ok(vec![AddrRecord {
                family: AddrFamily::Inet,
                socktype: SockType::Stream,
                protocol: IPPROTO_TCP,
                host: host.to_string(),
                port,
            }]),
            Lookup::System => {
                let records = tokio::net::lookup_host((host, port))
                    .await?
                    .map(|addr| AddrRecord {
                        family: if addr.is_ipv4() {
                            AddrFamily::Inet
                        } else {
                            AddrFamily::Inet6
                        },
                        socktype: SockType::Stream,
                        protocol: IPPROTO_TCP,
                        host: addr.ip().to_string(),
                        port: addr.port(),
                    })
                    .collect();
                Ok(records)
            },
        }
    }

    /// Open a TCP connection to `host:port` with the current dialer
    pub async fn connect(&self, host: &str, port: u16) -> Result<TcpStream> {
        match self.dialer {
            Dialer::Socks5(settings) => {
                let target = if settings.remote_dns || host.parse::<IpAddr>().is_ok() {
                    host.to_string()
                } else {
                    first_record(self.lookup_host(host, port).await?, host)?.host
                };
                socks::connect(settings.endpoint.addr(), &target, port).await
            },
            Dialer::Direct => {
                let mut last_err = None;
                for record in self.lookup_host(host, port).await? {
                    match TcpStream::connect((record.host.as_str(), record.port)).await {
                        Ok(stream) => return Ok(stream),
                        Err(e) => last_err = Some(e),
                    }
                }
                Err(last_err
                    .unwrap_or_else(|| {
                        io::Error::new(io::ErrorKind::NotFound, format!("no address for {}", host))
                    })
                    .into())
            },
        }
    }
}

fn first_record(records: Vec<AddrRecord>, host: &str) -> Result<AddrRecord> {
    records.into_iter().next().ok_or_else(|| {
        io::Error::new(io::ErrorKind::NotFound, format!("no address for {}", host)).into()
    })
}

/// Something that may carry a [`NetStack`] to bind.
///
/// Only targets that hand out a `NetStack` can be bound.
pub trait Capabilities {
    /// Name used in error messages
    fn name(&self) -> &str;

    fn net_stack(&mut self) -> Option<&mut NetStack>;
}

impl Capabilities for NetStack {
    fn name(&self) -> &str {
        "net"
    }

    fn net_stack(&mut self) -> Option<&mut NetStack> {
        Some(self)
    }
}

/// Capabilities replaced by [`bind`], kept so they can be put back
#[derive(Debug)]
#[must_use = "dropping the binding state makes the binding irreversible"]
pub struct BindingState {
    endpoint: ProxyEndpoint,
    saved_dialer: Dialer,
    saved_lookup: Lookup,
}

impl BindingState {
    /// Proxy the target was pointed at
    pub fn endpoint(&self) -> ProxyEndpoint {
        self.endpoint
    }

    /// Restore the dialer and lookup that were active before binding
    pub fn unbind(self, target: &mut dyn Capabilities) -> Result<()> {
        let name = target.name().to_string();
        let stack = target
            .net_stack()
            .ok_or(TorError::UnsupportedBinding(name))?;
        stack.dialer = self.saved_dialer;
        stack.lookup = self.saved_lookup;
        debug!("Unbound from {}", self.endpoint);
        Ok(())
    }
}

/// Route `target` through the SOCKS proxy at `endpoint`.
///
/// The dialer becomes a SOCKS5 dialer with remote DNS and the lookup
/// becomes a passthrough, so no hostname is resolved outside the proxy.
/// Unsupported targets fail without being modified.
pub fn bind(endpoint: ProxyEndpoint, target: &mut dyn Capabilities) -> Result<BindingState> {
    let name = target.name().to_string();
    let Some(stack) = target.net_stack() else {
        return Err(TorError::UnsupportedBinding(name));
    };

    let proxied = Dialer::Socks5(ProxySettings {
        endpoint,
        remote_dns: true,
    });
    let state = BindingState {
        endpoint,
        saved_dialer: std::mem::replace(&mut stack.dialer, proxied),
        saved_lookup: std::mem::replace(&mut stack.lookup, Lookup::Passthrough),
    };

    info!("Bound {} to socks5://{}", name, endpoint);
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    struct HttpClient {
        stack: Option<NetStack>,
    }

    impl Capabilities for HttpClient {
        fn name(&self) -> &str {
            "http-client"
        }

        fn net_stack(&mut self) -> Option<&mut NetStack> {
            self.stack.as_mut()
        }
    }

    fn endpoint() -> ProxyEndpoint {
        ProxyEndpoint::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 19050)
    }

    #[test]
    fn test_bind_replaces_both_capabilities() {
        let mut stack = NetStack::default();
        let state = bind(endpoint(), &mut stack).unwrap();

        assert_eq!(
            stack.dialer,
            Dialer::Socks5(ProxySettings {
                endpoint: endpoint(),
                remote_dns: true,
            })
        );
        assert_eq!(stack.lookup, Lookup::Passthrough);
        assert_eq!(state.endpoint(), endpoint());
    }

    #[test]
    fn test_unbind_restores_originals() {
        let mut stack = NetStack::default();
        let state = bind(endpoint(), &mut stack).unwrap();
        state.unbind(&mut stack).unwrap();
        assert_eq!(stack, NetStack::default());
    }

    #[test]
    fn test_unsupported_target_untouched() {
        let mut client = HttpClient { stack: None };
        match bind(endpoint(), &mut client) {
            Err(TorError::UnsupportedBinding(name)) => assert_eq!(name, "http-client"),
            other => panic!("expected UnsupportedBinding, got {:?}", other),
        }
        assert!(client.stack.is_none());
    }

    #[test]
    fn test_target_exposing_stack_is_supported() {
        let mut client = HttpClient {
            stack: Some(NetStack::default()),
        };
        let _state = bind(endpoint(), &mut client).unwrap();
        assert_eq!(client.stack.unwrap().lookup, Lookup::Passthrough);
    }

    #[tokio::test]
    async fn test_passthrough_lookup_keeps_host_and_port() {
        let mut stack = NetStack::default();
        let _state = bind(endpoint(), &mut stack).unwrap();

        let records = stack.lookup_host("example.onion", 443).await.unwrap();
        assert_eq!(
            records,
            vec![AddrRecord {
                family: AddrFamily::Inet,
                socktype: SockType::Stream,
                protocol: 6,
                host: "example.onion".to_string(),
                port: 443,
            }]
        );
    }

    #[tokio::test]
    async fn test_system_lookup_of_literal() {
        let records = NetStack::default().lookup_host("127.0.0.1", 80).await.unwrap();
        assert_eq!(records[0].host, "127.0.0.1");
        assert_eq!(records[0].family, AddrFamily::Inet);
    }
}
