//! Error types for directory operations.

use thiserror::Error;

/// Errors returned by directory operations.
///
/// Empty results and unknown identifiers are not errors; only data source
/// failures surface here.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The data source failed to answer a query.
    #[error("data source query failed: {0:#}")]
    Store(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, DirectoryError>;
