//! Configuration loading and validation
//!
//! Handles TOML configuration parsing with strict validation.
//! Every field has a default, so an empty file (or no file) is valid.

pub mod file;
mod validation;

pub use file::{load_from_path, load_or_default};
pub use validation::validate;

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TorlinkConfig {
    /// Path to (or name of) the tor executable
    pub tor_binary: PathBuf,
    /// Host the SOCKS and control listeners bind to
    pub listen_host: String,
    /// Deadline for the startup log scan
    pub startup_timeout_secs: u64,
    /// Per-reply read deadline on a control session
    pub control_timeout_secs: u64,
    /// How long to wait for a rate-limit notice after SIGNAL NEWNYM
    pub notice_wait_ms: u64,
    /// Optional DataDirectory handed to tor
    pub data_directory: Option<PathBuf>,
    /// Extra command line arguments appended verbatim
    pub extra_args: Vec<String>,
}

impl Default for TorlinkConfig {
    fn default() -> Self {
        Self {
            tor_binary: default_tor_binary(),
            listen_host: default_listen_host(),
            startup_timeout_secs: default_startup_timeout(),
            control_timeout_secs: default_control_timeout(),
            notice_wait_ms: default_notice_wait(),
            data_directory: None,
            extra_args: Vec::new(),
        }
    }
}

impl TorlinkConfig {
    /// Config with a custom tor binary and defaults everywhere else
    pub fn with_binary(tor_binary: impl Into<PathBuf>) -> Self {
        Self {
            tor_binary: tor_binary.into(),
            ..Self::default()
        }
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }

    pub fn control_timeout(&self) -> Duration {
        Duration::from_secs(self.control_timeout_secs)
    }

    pub fn notice_wait(&self) -> Duration {
        Duration::from_millis(self.notice_wait_ms)
    }
}

fn default_tor_binary() -> PathBuf {
    PathBuf::from("tor")
}

fn default_listen_host() -> String {
    "127.0.0.1".to_string()
}

fn default_startup_timeout() -> u64 {
    90
}

fn default_control_timeout() -> u64 {
    30
}

fn default_notice_wait() -> u64 {
    1000
}
