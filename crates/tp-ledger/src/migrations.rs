//! Migration runner. SQL is embedded at compile time; every statement uses
//! `IF NOT EXISTS`, so re-running on each open is safe.

use crate::Ledger;
use crate::error::LedgerError;

const MIGRATION_001: &str = include_str!("../migrations/001_ledger.sql");

impl Ledger {
    pub(crate) async fn run_migrations(&self) -> Result<(), LedgerError> {
        self.conn
            .execute_batch(MIGRATION_001)
            .await
            .map_err(|e| LedgerError::Migration(format!("001_ledger: {e}")))?;
        Ok(())
    }
}
