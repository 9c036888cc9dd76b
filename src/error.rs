//! Error type shared by every torlink operation.

use std::io;
use thiserror::Error;

/// Result alias used throughout the library
pub type Result<T> = std::result::Result<T, TorError>;

/// Failures raised by the supervisor, control operations and proxy binding.
#[derive(Debug, Error)]
pub enum TorError {
    /// The daemon binary could not be spawned
    #[error("Unable to run tor ({0})")]
    Spawn(#[source] io::Error),

    /// `--hash-password` did not produce a usable hash
    #[error("Unable to hash control password: {0}")]
    HashPassword(String),

    /// No free port could be reserved
    #[error("Unable to allocate a free port: {0}")]
    PortAllocation(String),

    /// The daemon logged an `[err]` line during startup
    #[error("{0}")]
    Startup(String),

    /// The daemon closed stdout before opening its control listener
    #[error("tor exited before opening its control listener")]
    StartupExited,

    /// Readiness was not observed within the configured deadline
    #[error("tor did not become ready within {0} seconds")]
    StartupTimeout(u64),

    /// The control port rejected our credential
    #[error("Unable to authenticate")]
    Auth,

    /// Forward or reverse resolution failed for the given subject
    #[error("Unable to resolve '{0}'")]
    Resolve(String),

    /// SIGNAL NEWNYM was rejected
    #[error("Could not create new circuit")]
    Circuit,

    /// The bind target does not expose a dial/lookup capability pair
    #[error("Invalid binding: {0}")]
    UnsupportedBinding(String),

    /// No daemon is running, typically after a failed restart
    #[error("tor is not running")]
    NotRunning,

    /// Malformed or truncated control protocol traffic
    #[error("Control protocol error: {0}")]
    Protocol(String),

    /// SOCKS5 dialing through the proxy endpoint failed
    #[error("Proxy error: {0}")]
    Proxy(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}
