//! Tor daemon interaction
//!
//! Process supervision, the control port client, and the control
//! operations built on it (resolution and circuit rotation).

pub mod circuit;
pub mod control;
pub mod credential;
pub mod ports;
pub mod process;
pub mod resolve;

pub use control::{ControlEndpoint, ControlSession, Reply};
pub use process::{DaemonInstance, TorProcess};
pub use resolve::Direction;
