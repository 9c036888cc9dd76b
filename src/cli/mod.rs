//! Command-line interface for torlink
//!
//! Every command launches a private tor instance, runs, and tears it down:
//! - `resolve` / `reverse` - Name resolution through tor
//! - `new-circuit` - Request a fresh exit identity
//! - `proxy` - Keep tor running and print its SOCKS endpoint
//! - `connect` - Open one TCP connection through the bound proxy

mod circuit;
mod proxy;
mod resolve;

pub use circuit::run_new_circuit;
pub use proxy::{run_connect, run_proxy};
pub use resolve::run_resolve;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// torlink - drive a private Tor daemon
#[derive(Parser, Debug)]
#[command(name = "torlink")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Path to the tor binary (overrides the config file)
    #[arg(long)]
    pub tor_binary: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve a hostname to an address through tor
    Resolve(ResolveArgs),

    /// Resolve an address to a hostname through tor
    Reverse(ResolveArgs),

    /// Request a new circuit (new exit identity)
    NewCircuit(NewCircuitArgs),

    /// Run tor and print its SOCKS endpoint until interrupted
    Proxy,

    /// Open a TCP connection through tor's SOCKS listener
    Connect(ConnectArgs),
}

/// Arguments for resolve and reverse
#[derive(Parser, Debug)]
pub struct ResolveArgs {
    /// Hostname or address to look up
    pub subject: String,
}

/// Arguments for new-circuit
#[derive(Parser, Debug)]
pub struct NewCircuitArgs {
    /// Number of rotations to request back to back
    #[arg(long, default_value_t = 1)]
    pub count: u32,
}

/// Arguments for connect
#[derive(Parser, Debug)]
pub struct ConnectArgs {
    /// Destination host (hostname, .onion, or IP)
    pub host: String,

    /// Destination port
    #[arg(default_value_t = 80)]
    pub port: u16,

    /// Send an HTTP HEAD request and print the status line
    #[arg(long, default_value_t = false)]
    pub http: bool,
}

/// Parse command line arguments
pub fn parse() -> Cli {
    Cli::parse()
}
