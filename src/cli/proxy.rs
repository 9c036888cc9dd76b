//! proxy / connect commands

use super::ConnectArgs;
use crate::config::TorlinkConfig;
use crate::proxy::NetStack;
use crate::tor::TorProcess;
use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

/// Keep tor running and print its SOCKS endpoint until Ctrl-C
pub async fn run_proxy(config: TorlinkConfig) -> Result<()> {
    let tor = TorProcess::start(config)
        .await
        .context("Failed to start tor")?;

    let endpoint = tor.proxy()?;
    println!("{} {}", endpoint.host, endpoint.port);
    println!("{}", endpoint.url());

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    tor.shutdown().await;
    Ok(())
}

/// Bind a fresh net stack to tor and open one connection through it
pub async fn run_connect(config: TorlinkConfig, args: &ConnectArgs) -> Result<()> {
    let tor = TorProcess::start(config)
        .await
        .context("Failed to start tor")?;

    let mut stack = NetStack::default();
    let binding = tor.bind(&mut stack)?;
    info!("Target: {}:{} via {}", args.host, args.port, binding.endpoint());

    let result = connect(&stack, args).await;
    binding.unbind(&mut stack)?;
    tor.shutdown().await;
    result
}

async fn connect(stack: &NetStack, args: &ConnectArgs) -> Result<()> {
    let mut stream = stack
        .connect(&args.host, args.port)
        .await
        .with_context(|| format!("Failed to connect to {}:{}", args.host, args.port))?;
    println!("Connected to {}:{}", args.host, args.port);

    if args.http {
        let request = format!(
            "HEAD / HTTP/1.0\r\nHost: {}\r\nConnection: close\r\n\r\n",
            args.host
        );
        stream.write_all(request.as_bytes()).await?;

        let mut status = String::new();
        BufReader::new(stream)
            .read_line(&mut status)
            .await
            .context("Failed to read HTTP response")?;
        println!("{}", status.trim_end());
    }

    Ok(())
}
