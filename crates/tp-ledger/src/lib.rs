//! # tp-ledger
//!
//! Local run ledger backed by libSQL.
//!
//! Holds the only state that outlives a run: the last successful watermark
//! per entity type, every [`RunResult`](tp_core::RunResult), and the records
//! each run failed to deliver.

pub mod error;
pub mod helpers;
mod migrations;
mod runs;
mod watermarks;

pub use error::LedgerError;
pub use runs::StoredRun;

use std::path::Path;

use libsql::Builder;

/// Handle to the run ledger database.
pub struct Ledger {
    #[allow(dead_code)]
    db: libsql::Database,
    conn: libsql::Connection,
}

impl Ledger {
    /// Open a local ledger at `path` (`:memory:` for tests).
    ///
    /// Runs migrations automatically on open.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError` if the database cannot be opened or
    /// migrations fail.
    pub async fn open_local(path: &str) -> Result<Self, LedgerError> {
        let db = Builder::new_local(path).build().await?;
        let conn = db.connect()?;

        // Enable foreign keys (must be per-connection in SQLite)
        conn.execute("PRAGMA foreign_keys = ON", ())
            .await
            .map_err(|e| LedgerError::Migration(format!("PRAGMA foreign_keys: {e}")))?;

        let ledger = Self { db, conn };
        ledger.run_migrations().await?;
        Ok(ledger)
    }

    /// Open the ledger file at `path`, creating its directory if needed.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError` if the directory cannot be created or the
    /// database cannot be opened.
    pub async fn open_file(path: &Path) -> Result<Self, LedgerError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        tracing::debug!(path = %path.display(), "opening run ledger");
        Self::open_local(&path.to_string_lossy()).await
    }

    #[must_use]
    pub const fn conn(&self) -> &libsql::Connection {
        &self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_local_creates_schema() {
        let ledger = Ledger::open_local(":memory:").await.unwrap();
        for table in ["watermarks", "run_results", "failed_records"] {
            let mut rows = ledger
                .conn()
                .query(
                    "SELECT name FROM sqlite_master WHERE type='table' AND name=?1",
                    [table],
                )
                .await
                .unwrap();
            assert!(rows.next().await.unwrap().is_some(), "table '{table}' should exist");
        }
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let ledger = Ledger::open_local(":memory:").await.unwrap();
        ledger.run_migrations().await.unwrap();
    }
}
