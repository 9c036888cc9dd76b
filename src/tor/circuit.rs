//! Circuit rotation (`SIGNAL NEWNYM`)

use super::control::{ControlEndpoint, ControlSession};
use crate::error::{Result, TorError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Event classes carrying tor's rate-limit notice
const NOTICE_EVENTS: &str = "SETEVENTS GUARD NOTICE";

/// Ask tor for a new circuit.
///
/// When tor answers with a rate-limit notice, this waits out the advertised
/// delay before returning. The signal itself is not resent.
pub async fn new_circuit(endpoint: &ControlEndpoint, notice_wait: Duration) -> Result<()> {
    let mut session = ControlSession::open(endpoint).await?;
    let result = rotate(&mut session, notice_wait).await;
    session.close().await;
    result
}

async fn rotate(session: &mut ControlSession, notice_wait: Duration) -> Result<()> {
    session.write_line("SIGNAL NEWNYM").await?;
    session.write_line(NOTICE_EVENTS).await?;

    let ack = session.read_reply().await?;
    if !ack.is_ok() {
        debug!("NEWNYM rejected: {} {}", ack.code, ack.text());
        return Err(TorError::Circuit);
    }
    info!("New circuit requested");

    let events_ack = session.read_reply().await?;
    if !events_ack.is_ok() {
        debug!("Notice subscription rejected: {}", events_ack.code);
        return Ok(());
    }

    let deadline = Instant::now() + notice_wait;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        let reply = match session.try_read_event(remaining).await {
            Ok(Some(reply)) => reply,
            Ok(None) => break,
            Err(e) => {
                debug!("Stopped waiting for notices: {}", e);
                break;
            },
        };

        if let Some(delay) = reply.lines.iter().find_map(|l| parse_rate_limit_delay(l)) {
            warn!("NEWNYM rate limited, waiting {} seconds", delay);
            tokio::time::sleep(Duration::from_secs(delay)).await;
            break;
        }
    }

    Ok(())
}

/// Extract N from `... Rate limiting NEWNYM request: delaying by N second(s)`
pub fn parse_rate_limit_delay(notice: &str) -> Option<u64> {
    if !notice.contains("Rate limiting") {
        return None;
    }
    let (_, after) = notice.split_once("delaying by ")?;
    let (count, _) = after.split_once(" second")?;
    count.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_delay() {
        assert_eq!(
            parse_rate_limit_delay("NOTICE Rate limiting NEWNYM request: delaying by 7 second(s)"),
            Some(7)
        );
        assert_eq!(
            parse_rate_limit_delay("NOTICE Rate limiting NEWNYM request: delaying by 1 second(s)"),
            Some(1)
        );
    }

    #[test]
    fn test_parse_delay_other_notice() {
        assert_eq!(parse_rate_limit_delay("NOTICE Bootstrapped 100% (done): Done"), None);
        assert_eq!(parse_rate_limit_delay("NOTICE delaying by 3 seconds"), None);
    }

    #[test]
    fn test_parse_delay_garbage_count() {
        assert_eq!(
            parse_rate_limit_delay("NOTICE Rate limiting NEWNYM request: delaying by many second(s)"),
            None
        );
    }
}
