//! Engine error types.
//!
//! Per-record and per-entity failures never surface here: they are folded
//! into each entity's [`RunResult`](tp_core::RunResult). `EngineError` is
//! reserved for failures that stop the whole run.

use thiserror::Error;
use tp_config::ConfigError;
use tp_ledger::LedgerError;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The run ledger could not be read or written.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Configuration is missing or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
