//! Minimal SOCKS5 CONNECT client (RFC 1928, no authentication)

use crate::error::{Result, TorError};
use std::net::{IpAddr, SocketAddr};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

const VERSION: u8 = 0x05;
const NO_AUTH: u8 = 0x00;
const CMD_CONNECT: u8 = 0x01;
const ATYP_IPV4: u8 = 0x01;
const ATYP_DOMAIN: u8 = 0x03;
const ATYP_IPV6: u8 = 0x04;

/// Open a TCP stream to `host:port` through the SOCKS5 proxy at `proxy`.
///
/// A hostname is sent as-is (address type 3), so the proxy performs the
/// DNS lookup.
pub async fn connect(proxy: SocketAddr, host: &str, port: u16) -> Result<TcpStream> {
    let mut socks = TcpStream::connect(proxy)
        .await
        .map_err(|e| TorError::Proxy(format!("Failed to connect to SOCKS proxy {}: {}", proxy, e)))?;

    socks.write_all(&[VERSION, 0x01, NO_AUTH]).await?;

    let mut response = [0u8; 2];
    socks.read_exact(&mut response).await?;
    if response[0] != VERSION || response[1] != NO_AUTH {
        return Err(TorError::Proxy("SOCKS5 auth negotiation failed".to_string()));
    }

    socks.write_all(&connect_request(host, port)?).await?;

    let mut header = [0u8; 4];
    socks.read_exact(&mut header).await?;
    if header[0] != VERSION {
        return Err(TorError::Proxy("Invalid SOCKS5 response version".to_string()));
    }
    if header[1] != 0x00 {
        return Err(TorError::Proxy(format!(
            "SOCKS5 connect failed: {}",
            reply_message(header[1])
        )));
    }

    // Bound address is unused but must be consumed
    let bound_len = match header[3] {
        ATYP_IPV4 => 4,
        ATYP_IPV6 => 16,
        ATYP_DOMAIN => socks.read_u8().await? as usize,
        other => {
            return Err(TorError::Proxy(format!(
                "Unknown SOCKS5 address type {}",
                other
            )))
        },
    };
    let mut bound = vec![0u8; bound_len + 2];
    socks.read_exact(&mut bound).await?;

    debug!("SOCKS5 connection established to {}:{}", host, port);
    Ok(socks)
}

/// Build the CONNECT request for `host:port`
pub fn connect_request(host: &str, port: u16) -> Result<Vec<u8>> {
    let mut request = vec![VERSION, CMD_CONNECT, 0x00];

    match host.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) => {
            request.push(ATYP_IPV4);
            request.extend_from_slice(&ip.octets());
        },
        Ok(IpAddr::V6(ip)) => {
            request.push(ATYP_IPV6);
            request.extend_from_slice(&ip.octets());
        },
        Err(_) => {
            let len = u8::try_from(host.len())
                .ok()
                .filter(|len| *len > 0)
                .ok_or_else(|| TorError::Proxy(format!("Invalid hostname length: {}", host.len())))?;
            request.push(ATYP_DOMAIN);
            request.push(len);
            request.extend_from_slice(host.as_bytes());
        },
    }

    request.extend_from_slice(&port.to_be_bytes());
    Ok(request)
}

fn reply_message(code: u8) -> &'static str {
    match code {
        0x01 => "general failure",
        0x02 => "connection not allowed by ruleset",
        0x03 => "network unreachable",
        0x04 => "host unreachable",
        0x05 => "connection refused",
        0x06 => "TTL expired",
        0x07 => "command not supported",
        0x08 => "address type not supported",
        _ => "unknown error",
    }
}
