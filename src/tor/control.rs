//! Tor Control Port client
//!
//! One short-lived, authenticated connection per logical operation. Replies
//! are read through a buffered line reader, so a single network read may
//! carry several replies or only part of one.
//!
//! Asynchronous `6xx` events may arrive ahead of a command's reply. They are
//! queued and handed out by [`ControlSession::read_event`], never mistaken
//! for the reply itself.

use crate::error::{Result, TorError};
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::debug;

/// Event classes subscribed to by [`ControlSession::open`]
pub const DEFAULT_EVENTS: &[&str] = &["ADDRMAP"];

/// Longest reply line accepted before the session is considered broken
pub const MAX_LINE_LEN: usize = 64 * 1024;

/// Where and how to reach a daemon's control listener
#[derive(Clone)]
pub struct ControlEndpoint {
    pub addr: SocketAddr,
    pub secret: String,
    /// Deadline for each reply
    pub timeout: Duration,
}

impl std::fmt::Debug for ControlEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlEndpoint")
            .field("addr", &self.addr)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// A complete control protocol reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Three digit status code of the final line
    pub code: u16,
    /// Text of each reply line after the status code and separator.
    /// Data blocks are folded into their introducing line, joined by `\n`.
    pub lines: Vec<String>,
}

impl Reply {
    pub fn is_ok(&self) -> bool {
        self.code == 250
    }

    /// Asynchronous event notification (any `6xx` code)
    pub fn is_event(&self) -> bool {
        (600..700).contains(&self.code)
    }

    /// First line of the reply
    pub fn text(&self) -> &str {
        self.lines.first().map(String::as_str).unwrap_or("")
    }
}

/// Incremental reply assembler.
///
/// Fed one line at a time (without CRLF); yields a [`Reply`] when the end
/// line (`NNN text`) arrives. Handles `NNN-` continuation lines and `NNN+`
/// data blocks terminated by a lone `.`.
#[derive(Debug, Default)]
pub struct ReplyParser {
    lines: Vec<String>,
    in_data: bool,
}

impl ReplyParser {
    pub fn push_line(&mut self, line: &str) -> Result<Option<Reply>> {
        if self.in_data {
            if line == "." {
                self.in_data = false;
            } else if let Some(last) = self.lines.last_mut() {
                let data = line.strip_prefix('.').unwrap_or(line);
                if !last.is_empty() {
                    last.push('\n');
                }
                last.push_str(data);
            }
            return Ok(None);
        }

        let code = line
            .get(..3)
            .filter(|c| c.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|c| c.parse::<u16>().ok())
            .ok_or_else(|| TorError::Protocol(format!("malformed reply line {:?}", line)))?;
        let text = line.get(4..).unwrap_or("").to_string();

        match line.as_bytes().get(3) {
            Some(b'-') => {
                self.lines.push(text);
                Ok(None)
            },
            Some(b'+') => {
                self.lines.push(text);
                self.in_data = true;
                Ok(None)
            },
            Some(b' ') | None => {
                self.lines.push(text);
                Ok(Some(Reply {
                    code,
                    lines: std::mem::take(&mut self.lines),
                }))
            },
            Some(_) => Err(TorError::Protocol(format!(
                "malformed reply line {:?}",
                line
            ))),
        }
    }
}

/// An authenticated control connection
#[derive(Debug)]
pub struct ControlSession {
    stream: BufReader<TcpStream>,
    parser: ReplyParser,
    pending: Vec<u8>,
    events: VecDeque<Reply>,
    timeout: Duration,
    authenticated: bool,
}

impl ControlSession {
    /// Connect, authenticate and subscribe to ADDRMAP events
    pub async fn open(endpoint: &ControlEndpoint) -> Result<Self> {
        Self::open_with_events(endpoint, DEFAULT_EVENTS).await
    }

    /// Connect, authenticate and subscribe to `events` (none if empty)
    pub async fn open_with_events(endpoint: &ControlEndpoint, events: &[&str]) -> Result<Self> {
        debug!("Connecting to Tor control port: {}", endpoint.addr);
        let stream = TcpStream::connect(endpoint.addr).await?;

        let mut session = Self {
            stream: BufReader::new(stream),
            parser: ReplyParser::default(),
            pending: Vec::new(),
            events: VecDeque::new(),
            timeout: endpoint.timeout,
            authenticated: false,
        };

        if let Err(e) = session.authenticate(&endpoint.secret).await {
            session.close().await;
            return Err(e);
        }
        if !events.is_empty() {
            if let Err(e) = session.set_events(events).await {
                session.close().await;
                return Err(e);
            }
        }

        Ok(session)
    }

    async fn authenticate(&mut self, secret: &str) -> Result<()> {
        let line = format!("AUTHENTICATE {}", quote(secret));
        self.write_raw(&line).await?;
        debug!("Sent AUTHENTICATE");

        let reply = match self.read_reply().await {
            Ok(reply) => reply,
            Err(e) => {
                debug!("No usable AUTHENTICATE reply: {}", e);
                return Err(TorError::Auth);
            },
        };
        if !reply.is_ok() {
            debug!("Authentication rejected: {} {}", reply.code, reply.text());
            return Err(TorError::Auth);
        }

        self.authenticated = true;
        Ok(())
    }

    /// Replace the event subscription with `events`
    pub async fn set_events(&mut self, events: &[&str]) -> Result<()> {
        let reply = self
            .send_command(&format!("SETEVENTS {}", events.join(" ")))
            .await?;
        if !reply.is_ok() {
            return Err(TorError::Protocol(format!(
                "SETEVENTS rejected: {} {}",
                reply.code,
                reply.text()
            )));
        }
        Ok(())
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Send one command line and read its reply
    pub async fn send_command(&mut self, line: &str) -> Result<Reply> {
        self.write_line(line).await?;
        self.read_reply().await
    }

    /// Send one command line without waiting for the reply
    pub async fn write_line(&mut self, line: &str) -> Result<()> {
        if !self.authenticated {
            return Err(TorError::Protocol(
                "command sent before authentication".to_string(),
            ));
        }
        debug!("Sending Tor command: {}", line);
        self.write_raw(line).await
    }

    async fn write_raw(&mut self, line: &str) -> Result<()> {
        if line.contains(['\r', '\n']) {
            return Err(TorError::Protocol(
                "command must be a single line".to_string(),
            ));
        }
        let stream = self.stream.get_mut();
        stream.write_all(line.as_bytes()).await?;
        stream.write_all(b"\r\n").await?;
        stream.flush().await?;
        Ok(())
    }

    /// Read the next synchronous reply, failing after the session timeout.
    ///
    /// Events received on the way are queued for [`Self::read_event`].
    pub async fn read_reply(&mut self) -> Result<Reply> {
        let timeout = self.timeout;
        match tokio::time::timeout(timeout, self.next_sync_reply()).await {
            Ok(result) => result,
            Err(_) => Err(TorError::Protocol(format!(
                "timeout waiting for Tor response after {:?}",
                timeout
            ))),
        }
    }

    /// Next asynchronous event, failing after the session timeout
    pub async fn read_event(&mut self) -> Result<Reply> {
        let timeout = self.timeout;
        match tokio::time::timeout(timeout, self.next_event()).await {
            Ok(result) => result,
            Err(_) => Err(TorError::Protocol(format!(
                "timeout waiting for Tor event after {:?}",
                timeout
            ))),
        }
    }

    /// Next asynchronous event if one is queued or arrives within `wait`
    pub async fn try_read_event(&mut self, wait: Duration) -> Result<Option<Reply>> {
        if let Some(event) = self.events.pop_front() {
            return Ok(Some(event));
        }
        match tokio::time::timeout(wait, self.next_event()).await {
            Ok(result) => result.map(Some),
            Err(_) => Ok(None),
        }
    }

    async fn next_sync_reply(&mut self) -> Result<Reply> {
        loop {
            let reply = self.next_reply().await?;
            if !reply.is_event() {
                return Ok(reply);
            }
            debug!("Queued event while awaiting reply: {}", reply.text());
            self.events.push_back(reply);
        }
    }

    async fn next_event(&mut self) -> Result<Reply> {
        if let Some(event) = self.events.pop_front() {
            return Ok(event);
        }
        let reply = self.next_reply().await?;
        if !reply.is_event() {
            return Err(TorError::Protocol(format!(
                "unsolicited reply {} {}",
                reply.code,
                reply.text()
            )));
        }
        Ok(reply)
    }

    // Partial lines live in `pending` and partial replies in `parser`, so a
    // timed out read resumes cleanly on the next call.
    async fn next_reply(&mut self) -> Result<Reply> {
        loop {
            let room = MAX_LINE_LEN.saturating_sub(self.pending.len());
            if room == 0 {
                return Err(TorError::Protocol(format!(
                    "reply line longer than {} bytes",
                    MAX_LINE_LEN
                )));
            }
            let n = (&mut self.stream)
                .take(room as u64)
                .read_until(b'\n', &mut self.pending)
                .await?;
            if n == 0 {
                return Err(TorError::Protocol(
                    "control connection closed".to_string(),
                ));
            }
            if !self.pending.ends_with(b"\n") {
                continue;
            }

            let raw = String::from_utf8_lossy(&self.pending).into_owned();
            self.pending.clear();
            let line = raw.trim_end_matches(['\r', '\n']);
            debug!("Read line: {:?}", line);

            if let Some(reply) = self.parser.push_line(line)? {
                return Ok(reply);
            }
        }
    }

    /// Shut the connection down
    pub async fn close(self) {
        let mut stream = self.stream.into_inner();
        if let Err(e) = stream.shutdown().await {
            debug!("Control socket shutdown: {}", e);
        }
    }
}

/// Quote a string for the control protocol
fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(lines: &[&str]) -> Vec<Reply> {
        let mut parser = ReplyParser::default();
        lines
            .iter()
            .filter_map(|l| parser.push_line(l).unwrap())
            .collect()
    }

    #[test]
    fn test_single_line_reply() {
        let replies = feed(&["250 OK"]);
        assert_eq!(replies.len(), 1);
        assert!(replies[0].is_ok());
        assert_eq!(replies[0].text(), "OK");
    }

    #[test]
    fn test_multi_line_reply() {
        let replies = feed(&["250-version=0.4.8.12", "250-config-file=/etc/tor/torrc", "250 OK"]);
        assert_eq!(replies.len(), 1);
        assert_eq!(
            replies[0].lines,
            vec!["version=0.4.8.12", "config-file=/etc/tor/torrc", "OK"]
        );
    }

    #[test]
    fn test_data_block_reply() {
        let replies = feed(&["250+info/names=", "a", "..dotted", ".", "250 OK"]);
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].lines[0], "info/names=\na\n.dotted");
    }

    #[test]
    fn test_consecutive_replies() {
        let replies = feed(&["250 OK", "650 ADDRMAP example.com 93.184.216.34 NEVER"]);
        assert_eq!(replies.len(), 2);
        assert!(replies[1].is_event());
        assert_eq!(replies[1].text(), "ADDRMAP example.com 93.184.216.34 NEVER");
    }

    #[test]
    fn test_error_reply() {
        let replies = feed(&["515 Authentication failed"]);
        assert_eq!(replies[0].code, 515);
        assert!(!replies[0].is_ok());
    }

    #[test]
    fn test_malformed_line() {
        let mut parser = ReplyParser::default();
        assert!(parser.push_line("hello").is_err());
        assert!(parser.push_line("25").is_err());
        assert!(parser.push_line("250*OK").is_err());
    }

    #[test]
    fn test_quote() {
        assert_eq!(quote("abc"), "\"abc\"");
        assert_eq!(quote("a\"b\\c"), "\"a\\\"b\\\\c\"");
    }
}
