//! Directory (search core) configuration.

use serde::{Deserialize, Serialize};

/// Settings for the member directory operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Public host of the network web site, used for profile links.
    #[serde(default = "default_network_host")]
    pub network_host: String,

    /// Keep an in-process metadata lookup table for profile assembly.
    #[serde(default = "default_true")]
    pub cache_metadata: bool,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            network_host: default_network_host(),
            cache_metadata: true,
        }
    }
}

impl DirectoryConfig {
    /// Public profile URL of a member.
    pub fn profile_url(&self, username: &str) -> String {
        format!("https://{}/~{}/", self.network_host, username)
    }
}

fn default_network_host() -> String {
    "www.hipeac.net".to_string()
}

fn default_true() -> bool {
    true
}
