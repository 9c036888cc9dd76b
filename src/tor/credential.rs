//! One-time control port credential
//!
//! The secret never touches disk; tor only learns its salted hash through
//! `--HashedControlPassword`.

use crate::error::{Result, TorError};
use crate::util::rand::random_hex;
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

/// Plaintext secret plus the hash produced by `tor --hash-password`
#[derive(Clone)]
pub struct Credential {
    pub secret: String,
    pub hashed: String,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("secret", &"<redacted>")
            .field("hashed", &self.hashed)
            .finish()
    }
}

/// Generate a random secret and hash it with the daemon binary
pub async fn generate(tor_binary: &Path) -> Result<Credential> {
    let secret = random_hex::<16>();
    let output = Command::new(tor_binary)
        .arg("--hash-password")
        .arg(&secret)
        .output()
        .await
        .map_err(TorError::Spawn)?;

    if !output.status.success() {
        return Err(TorError::HashPassword(format!(
            "{} exited with {}",
            tor_binary.display(),
            output.status
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let hashed = extract_hash(&stdout)
        .ok_or_else(|| TorError::HashPassword("empty output".to_string()))?;
    debug!("Generated hashed control password");

    Ok(Credential { secret, hashed })
}

/// Pick the hash out of `--hash-password` output.
///
/// Older tor builds print log lines before the hash, so prefer the last
/// line carrying the `16:` S2K prefix.
pub fn extract_hash(output: &str) -> Option<String> {
    let lines: Vec<&str> = output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    lines
        .iter()
        .rev()
        .find(|line| line.starts_with("16:"))
        .or_else(|| lines.last())
        .map(|line| line.to_string())
}
