//! Configuration file loading

use super::TorlinkConfig;
use anyhow::{Context, Result};
use std::path::Path;

/// Load and parse config from path
pub fn load_from_path(path: &Path) -> Result<TorlinkConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: TorlinkConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    super::validate(&config)?;

    Ok(config)
}

/// Load from `path` when given, otherwise fall back to defaults
pub fn load_or_default(path: Option<&Path>) -> Result<TorlinkConfig> {
    match path {
        Some(path) => load_from_path(path),
        None => {
            let config = TorlinkConfig::default();
            super::validate(&config)?;
            Ok(config)
        },
    }
}
