//! CLI command implementations for the HiPEAC directory MCP server.

pub mod check;
pub mod mcp;

use anyhow::{Context, Result};
use hipeac_core::HipeacConfig;
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Read the configuration file. A missing file yields `None`.
pub fn read_config(path: &Path) -> Result<Option<HipeacConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let config = HipeacConfig::from_file(path)
        .with_context(|| format!("Failed to load config file: {}", path.display()))?;
    Ok(Some(config))
}

/// Load the configuration and install the log subscriber.
///
/// Logs go to stderr; stdout belongs to the stdio transport. `RUST_LOG`
/// takes precedence over `observability.log_filter`.
pub fn bootstrap(path: &Path) -> Result<HipeacConfig> {
    let loaded = read_config(path)?;

    let default_filter = loaded
        .as_ref()
        .map(|c| c.observability.log_filter.as_str())
        .unwrap_or("info");
    init_logging(default_filter);

    Ok(match loaded {
        Some(config) => {
            tracing::info!(config = %path.display(), "Loaded configuration");
            config
        }
        None => {
            tracing::warn!(config = %path.display(), "Config file not found, using defaults");
            HipeacConfig::default()
        }
    })
}

pub fn init_logging(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
