//! Name resolution through the daemon
//!
//! Issues `RESOLVE` on a dedicated control session and waits for the
//! matching `650 ADDRMAP` event.

use super::control::{ControlEndpoint, ControlSession, Reply};
use crate::error::{Result, TorError};
use tracing::debug;

/// Value tor reports in place of an address when resolution fails
pub const UNRESOLVABLE: &str = "<error>";

/// ADDRMAP events for other lookups are skipped, up to this many
const MAX_FOREIGN_EVENTS: usize = 32;

/// Direction of a lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// hostname -> address
    Forward,
    /// address -> hostname
    Reverse,
}

/// A parsed `ADDRMAP` event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddrMap {
    /// The name or address that was looked up
    pub key: String,
    /// `None` when tor reported the subject as unresolvable
    pub value: Option<String>,
}

impl AddrMap {
    fn answers(&self, subject: &str) -> bool {
        self.key.eq_ignore_ascii_case(subject)
            || self
                .key
                .strip_prefix("REVERSE[")
                .and_then(|k| k.strip_suffix(']'))
                .is_some_and(|k| k.eq_ignore_ascii_case(subject))
    }
}

/// Parse an `ADDRMAP` event reply, `None` if the reply has another shape
pub fn parse_addrmap(reply: &Reply) -> Option<AddrMap> {
    if !reply.is_event() {
        return None;
    }
    let mut fields = reply.text().split_whitespace();
    if fields.next() != Some("ADDRMAP") {
        return None;
    }
    let key = fields.next()?;
    let value = fields.next()?;

    Some(AddrMap {
        key: key.to_string(),
        value: (value != UNRESOLVABLE).then(|| value.to_string()),
    })
}

/// Resolve `subject` in the given direction through tor
pub async fn resolve(
    endpoint: &ControlEndpoint,
    subject: &str,
    direction: Direction,
) -> Result<String> {
    if subject.is_empty() || subject.contains(char::is_whitespace) {
        return Err(TorError::Resolve(subject.to_string()));
    }

    let mut session = ControlSession::open(endpoint).await?;
    let result = resolve_on(&mut session, subject, direction).await;
    session.close().await;

    result.map_err(|e| {
        debug!("Resolution of {} failed: {}", subject, e);
        TorError::Resolve(subject.to_string())
    })
}

/// Resolve a hostname to an address
pub async fn gethostbyname(endpoint: &ControlEndpoint, hostname: &str) -> Result<String> {
    resolve(endpoint, hostname, Direction::Forward).await
}

/// Resolve an address to a hostname
pub async fn gethostbyaddr(endpoint: &ControlEndpoint, address: &str) -> Result<String> {
    resolve(endpoint, address, Direction::Reverse).await
}

async fn resolve_on(
    session: &mut ControlSession,
    subject: &str,
    direction: Direction,
) -> Result<String> {
    let command = match direction {
        Direction::Forward => format!("RESOLVE {}", subject),
        Direction::Reverse => format!("RESOLVE {} mode=reverse", subject),
    };

    let ack = session.send_command(&command).await?;
    if !ack.is_ok() {
        return Err(TorError::Protocol(format!(
            "RESOLVE rejected: {} {}",
            ack.code,
            ack.text()
        )));
    }

    for _ in 0..MAX_FOREIGN_EVENTS {
        let reply = session.read_event().await?;
        let event = parse_addrmap(&reply).ok_or_else(|| {
            TorError::Protocol(format!("unexpected reply {} {}", reply.code, reply.text()))
        })?;

        if !event.answers(subject) {
            debug!("Skipping ADDRMAP for {}", event.key);
            continue;
        }

        return event
            .value
            .ok_or_else(|| TorError::Resolve(subject.to_string()));
    }

    Err(TorError::Protocol("no matching ADDRMAP event".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(text: &str) -> Reply {
        Reply {
            code: 650,
            lines: vec![text.to_string()],
        }
    }

    #[test]
    fn test_parse_resolved() {
        let map = parse_addrmap(&event(
            "ADDRMAP github.com 140.82.121.4 \"2026-10-17 10:30:00\" EXPIRES=\"2026-10-17 10:30:00\" CACHED=\"NO\"",
        ))
        .unwrap();
        assert_eq!(map.key, "github.com");
        assert_eq!(map.value.as_deref(), Some("140.82.121.4"));
    }

    #[test]
    fn test_parse_unresolvable() {
        let map = parse_addrmap(&event("ADDRMAP nx.invalid <error> NEVER error=yes")).unwrap();
        assert!(map.value.is_none());
    }

    #[test]
    fn test_parse_wrong_shape() {
        assert!(parse_addrmap(&event("CIRC 5 BUILT")).is_none());
        assert!(parse_addrmap(&event("ADDRMAP github.com")).is_none());
        assert!(parse_addrmap(&Reply {
            code: 250,
            lines: vec!["ADDRMAP a b".to_string()],
        })
        .is_none());
    }

    #[test]
    fn test_reverse_key_matches_subject() {
        let map = parse_addrmap(&event("ADDRMAP REVERSE[1.1.1.1] one.one.one.one NEVER")).unwrap();
        assert!(map.answers("1.1.1.1"));
        assert!(!map.answers("8.8.8.8"));
    }
}
