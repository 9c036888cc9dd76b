//! torlink - supervise a private Tor daemon
//!
//! # Usage
//!
//! ```bash
//! # Resolve through tor
//! torlink resolve github.com
//! torlink reverse 140.82.121.4
//!
//! # Rotate the exit identity
//! torlink new-circuit
//!
//! # Keep a tor instance running and print its SOCKS endpoint
//! torlink proxy
//!
//! # Open a proxied connection
//! torlink connect example.onion 80 --http
//! ```

use anyhow::Result;
use tracing::info;

use torlink::cli::{self, Commands};
use torlink::tor::Direction;
use torlink::{config, logging};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::parse();

    logging::init(cli.verbose);

    info!("torlink v{} starting", torlink::VERSION);

    let mut config = config::load_or_default(cli.config.as_deref())?;
    if let Some(binary) = &cli.tor_binary {
        config.tor_binary = binary.clone();
    }

    match &cli.command {
        Commands::Resolve(args) => {
            cli::run_resolve(config, args, Direction::Forward).await?;
        },
        Commands::Reverse(args) => {
            cli::run_resolve(config, args, Direction::Reverse).await?;
        },
        Commands::NewCircuit(args) => {
            cli::run_new_circuit(config, args).await?;
        },
        Commands::Proxy => {
            cli::run_proxy(config).await?;
        },
        Commands::Connect(args) => {
            cli::run_connect(config, args).await?;
        },
    }

    Ok(())
}
