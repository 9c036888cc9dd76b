//! resolve / reverse commands

use super::ResolveArgs;
use crate::config::TorlinkConfig;
use crate::tor::{Direction, TorProcess};
use anyhow::{Context, Result};

/// Run a forward or reverse lookup and print the answer
pub async fn run_resolve(
    config: TorlinkConfig,
    args: &ResolveArgs,
    direction: Direction,
) -> Result<()> {
    let tor = TorProcess::start(config)
        .await
        .context("Failed to start tor")?;

    let result = tor.resolve(&args.subject, direction).await;
    tor.shutdown().await;

    println!("{}", result?);
    Ok(())
}
