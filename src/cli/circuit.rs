//! new-circuit command

use super::NewCircuitArgs;
use crate::config::TorlinkConfig;
use crate::tor::TorProcess;
use anyhow::{Context, Result};
use tracing::info;

/// Request one or more new circuits
pub async fn run_new_circuit(config: TorlinkConfig, args: &NewCircuitArgs) -> Result<()> {
    let tor = TorProcess::start(config)
        .await
        .context("Failed to start tor")?;

    let mut result = Ok(());
    for attempt in 1..=args.count {
        info!("Requesting new circuit ({}/{})", attempt, args.count);
        result = tor.new_circuit().await;
        if result.is_err() {
            break;
        }
    }
    tor.shutdown().await;

    result.context("New circuit request failed")?;
    println!("New circuit ready");
    Ok(())
}
