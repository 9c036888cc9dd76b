//! torlink library crate
//!
//! Runs a private Tor daemon and exposes it to the rest of the program.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface (resolve, new-circuit, proxy, connect)
//! - [`config`] - Configuration loading and validation
//! - [`tor`] - Process supervision and control port operations
//! - [`proxy`] - Routing connections through tor's SOCKS listener
//! - [`util`] - Randomization helpers
//!
//! # Example
//!
//! ```no_run
//! use torlink::config::TorlinkConfig;
//! use torlink::proxy::NetStack;
//! use torlink::tor::TorProcess;
//!
//! # async fn example() -> torlink::Result<()> {
//! let tor = TorProcess::start(TorlinkConfig::with_binary("./tor")).await?;
//!
//! let mut stack = NetStack::default();
//! let _binding = tor.bind(&mut stack)?;
//! let _stream = stack.connect("check.torproject.org", 443).await?;
//!
//! tor.new_circuit().await?;
//! println!("{}", tor.gethostbyname("github.com").await?);
//! # Ok(())
//! # }
//! ```

#![allow(clippy::doc_markdown)] // Doc formatting is secondary
#![allow(clippy::uninlined_format_args)] // Format string style preference
#![allow(clippy::missing_const_for_fn)] // Const fn optimization is low priority
#![allow(clippy::module_name_repetitions)] // TorProcess in tor::process reads fine
#![allow(clippy::new_without_default)] // Explicit new() is fine
#![allow(clippy::single_match_else)] // Match for clarity

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod proxy;
pub mod tor;
pub mod util;

pub use error::{Result, TorError};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
