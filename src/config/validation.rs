//! Configuration validation
//!
//! Fail-fast validation of configuration invariants.

use super::TorlinkConfig;
use anyhow::{bail, Result};
use std::net::IpAddr;

/// Validate configuration invariants
pub fn validate(config: &TorlinkConfig) -> Result<()> {
    validate_binary(config)?;
    validate_host(config)?;
    validate_timing(config)?;
    Ok(())
}

fn validate_binary(config: &TorlinkConfig) -> Result<()> {
    if config.tor_binary.as_os_str().is_empty() {
        bail!("tor_binary cannot be empty");
    }
    Ok(())
}

fn validate_host(config: &TorlinkConfig) -> Result<()> {
    if config.listen_host.parse::<IpAddr>().is_err() {
        bail!(
            "listen_host must be an IP address, got {:?}",
            config.listen_host
        );
    }
    Ok(())
}

fn validate_timing(config: &TorlinkConfig) -> Result<()> {
    if config.startup_timeout_secs == 0 {
        bail!("startup_timeout_secs must be greater than 0");
    }
    if config.control_timeout_secs == 0 {
        bail!("control_timeout_secs must be greater than 0");
    }
    Ok(())
}
