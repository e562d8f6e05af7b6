//! Ledger error types.

use thiserror::Error;

/// Errors from run ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// A SQL query failed or returned unparseable data.
    #[error("Query failed: {0}")]
    Query(String),

    /// Schema migration failed.
    #[error("Migration failed: {0}")]
    Migration(String),

    /// The ledger file's directory could not be created.
    #[error("Cannot create ledger directory: {0}")]
    Io(#[from] std::io::Error),

    /// A stored record or reason could not be (de)serialized.
    #[error("Serialization failed: {0}")]
    Serde(#[from] serde_json::Error),

    /// Underlying libSQL error.
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),
}
