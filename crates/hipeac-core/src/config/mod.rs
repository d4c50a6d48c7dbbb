//! Configuration types for the HiPEAC directory MCP server.
//!
//! Configuration is loaded from a single YAML file (`hipeac.yaml`) into a
//! [`HipeacConfig`]. Every section is optional and falls back to defaults.
//!
//! # Sections
//!
//! - **upstream**: MySQL connection (URL, credentials, SSL, pool)
//! - **mcp**: transport selection and HTTP bind address
//! - **directory**: profile link host and metadata caching
//! - **observability**: log filter

pub mod directory;
pub mod mcp;
pub mod upstream;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub use directory::DirectoryConfig;
pub use mcp::{McpConfig, Transport};
pub use upstream::{ConnectionPoolConfig, ContentTypeRef, SslMode, UpstreamConfig};

/// Complete configuration loaded from `hipeac.yaml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HipeacConfig {
    /// Upstream MySQL connection.
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// MCP server configuration.
    #[serde(default)]
    pub mcp: McpConfig,

    /// Directory operation settings.
    #[serde(default)]
    pub directory: DirectoryConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
        }
    }
}

fn default_log_filter() -> String {
    "info".to_string()
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl HipeacConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        // An empty file is a valid, all-defaults configuration.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that cannot work at runtime.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.directory.network_host.trim().is_empty() {
            return Err(ConfigError::Config(
                "directory.network_host must not be empty".to_string(),
            ));
        }
        if self.upstream.pool_config().max_connections == 0 {
            return Err(ConfigError::Config(
                "upstream.pool.max_connections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
