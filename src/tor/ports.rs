//! Ephemeral port allocation for the SOCKS and control listeners

use crate::error::{Result, TorError};
use std::net::{IpAddr, SocketAddr, TcpListener};

/// Upper bound on bind attempts before giving up
const MAX_ATTEMPTS: usize = 32;

/// Ports handed to one daemon instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortPair {
    pub socks: u16,
    pub control: u16,
}

/// Reserve two distinct free TCP ports on `host`, skipping any in `exclude`.
///
/// Every listener stays open until both ports are chosen, so the kernel
/// cannot hand the same port out twice. The listeners are closed on return;
/// the ports are free but unreserved by the time tor binds them.
pub fn allocate_pair(host: IpAddr, exclude: &[u16]) -> Result<PortPair> {
    let mut held = Vec::new();
    let mut chosen = Vec::with_capacity(2);

    for _ in 0..MAX_ATTEMPTS {
        let listener = TcpListener::bind(SocketAddr::new(host, 0))
            .map_err(|e| TorError::PortAllocation(e.to_string()))?;
        let port = listener.local_addr()?.port();
        if !exclude.contains(&port) && !chosen.contains(&port) {
            chosen.push(port);
        }
        held.push(listener);
        if chosen.len() == 2 {
            return Ok(PortPair {
                socks: chosen[0],
                control: chosen[1],
            });
        }
    }

    Err(TorError::PortAllocation(format!(
        "no usable port after {} attempts",
        MAX_ATTEMPTS
    )))
}
