//! `hipeac check` command implementation.
//!
//! Connects to the upstream database the way the server does and reports:
//! - whether the member content type resolves
//! - how many metadata values each vocabulary holds
//! - whether the session refuses writes

use anyhow::Result;
use clap::Args;
use hipeac_adapter_mysql::MySqlDirectoryStore;
use hipeac_core::{HipeacConfig, MetadataType};
use hipeac_directory::Directory;
use std::path::PathBuf;
use std::sync::Arc;

/// Arguments for `hipeac check`.
#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Configuration file path.
    #[arg(short, long, default_value = "hipeac.yaml")]
    pub config: PathBuf,
}

// ============================================================================
// Check Result Types
// ============================================================================

/// Severity level for check results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// A single check finding.
#[derive(Debug, Clone)]
pub struct CheckFinding {
    pub severity: Severity,
    /// Category of the check that produced this finding.
    pub category: &'static str,
    pub message: String,
}

impl CheckFinding {
    fn error(category: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            category,
            message: message.into(),
        }
    }

    fn warning(category: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            category,
            message: message.into(),
        }
    }

    fn info(category: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            category,
            message: message.into(),
        }
    }
}

/// Results from running all checks.
#[derive(Debug, Default)]
pub struct CheckResults {
    pub findings: Vec<CheckFinding>,
}

impl CheckResults {
    fn add(&mut self, finding: CheckFinding) {
        self.findings.push(finding);
    }

    pub fn has_errors(&self) -> bool {
        self.findings.iter().any(|f| f.severity == Severity::Error)
    }

    fn count(&self, severity: Severity) -> usize {
        self.findings
            .iter()
            .filter(|f| f.severity == severity)
            .count()
    }

    /// Print human-readable summary.
    pub fn print_summary(&self) {
        let mut findings: Vec<_> = self.findings.iter().collect();
        findings.sort_by_key(|f| std::cmp::Reverse(f.severity));

        println!();
        for finding in findings {
            let icon = match finding.severity {
                Severity::Error => "✗",
                Severity::Warning => "⚠",
                Severity::Info => "ℹ",
            };
            println!("  {} [{}] {}", icon, finding.category, finding.message);
        }

        println!();
        println!("{}", "═".repeat(60));
        let errors = self.count(Severity::Error);
        let warnings = self.count(Severity::Warning);
        if errors == 0 && warnings == 0 {
            println!("✅ All checks passed!");
        } else {
            println!("Summary: {} error(s), {} warning(s)", errors, warnings);
        }
    }
}

// ============================================================================
// Main Check Runner
// ============================================================================

/// Execute the check command. Fails when any check reports an error.
pub async fn execute(args: CheckArgs) -> Result<()> {
    let config = super::bootstrap(&args.config)?;
    let results = run(&config).await;
    results.print_summary();

    if results.has_errors() {
        anyhow::bail!("{} check(s) failed", results.count(Severity::Error));
    }
    Ok(())
}

/// Run every check against the configured database.
pub async fn run(config: &HipeacConfig) -> CheckResults {
    let mut results = CheckResults::default();

    if !config.upstream.uses_env_credentials() && config.upstream.password.is_some() {
        results.add(CheckFinding::warning(
            "config",
            "upstream.password is stored in the config file; prefer password_env",
        ));
    }

    let store = match MySqlDirectoryStore::connect(&config.upstream).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            results.add(CheckFinding::error(
                "connection",
                format!("Failed to connect: {:#}", e),
            ));
            return results;
        }
    };
    results.add(CheckFinding::info(
        "connection",
        format!(
            "Connected; member content type {}.{} resolved",
            config.upstream.member_content_type.app_label, config.upstream.member_content_type.model
        ),
    ));

    let directory = Directory::new(store.clone(), config.directory.clone());
    for metadata_type in MetadataType::ALL {
        match directory.catalog().list(metadata_type).await {
            Ok(items) if items.is_empty() => results.add(CheckFinding::warning(
                "metadata",
                format!("No {} values", metadata_type.as_str()),
            )),
            Ok(items) => results.add(CheckFinding::info(
                "metadata",
                format!("{} {} values", items.len(), metadata_type.as_str()),
            )),
            Err(e) => results.add(CheckFinding::error("metadata", e.to_string())),
        }
    }

    results.add(check_read_only(&store).await);
    results
}

/// A no-op UPDATE must still be refused by a read-only session.
async fn check_read_only(store: &MySqlDirectoryStore) -> CheckFinding {
    let write = sqlx::query("UPDATE hipeac_metadata SET value = value WHERE 1 = 0")
        .execute(store.pool())
        .await;

    match write {
        Err(e) => CheckFinding::info("read-only", format!("Writes are refused ({})", e)),
        Ok(_) => CheckFinding::error(
            "read-only",
            "Session accepted a write statement; the server must run read-only",
        ),
    }
}
