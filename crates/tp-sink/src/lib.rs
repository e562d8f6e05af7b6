//! # tp-sink
//!
//! The table sink boundary. [`TableSink`] describes, migrates, and upserts
//! into one table per entity type; [`PostgrestSink`] implements it against a
//! PostgREST (Supabase-style) REST surface.

mod error;
mod http;
mod postgrest;
mod row;

pub use error::SinkError;
pub use postgrest::PostgrestSink;
pub use row::{Row, RowEncoder};

use async_trait::async_trait;
use tp_core::{SchemaDelta, TableSchema};

/// A relational store reachable with the elevated credential.
#[async_trait]
pub trait TableSink: Send + Sync {
    /// Current definition of `table`, or `None` if it does not exist.
    async fn describe(&self, table: &str) -> Result<Option<TableSchema>, SinkError>;

    /// Apply an additive schema delta. An empty delta is a no-op.
    async fn apply(&self, delta: &SchemaDelta) -> Result<(), SinkError>;

    /// Insert-or-update `rows` keyed by the `conflict` columns. Atomic per
    /// call: either every row is written or none is.
    async fn upsert(&self, table: &str, conflict: &[&str], rows: &[Row]) -> Result<(), SinkError>;

    /// Check that the sink is reachable and the credential accepted.
    async fn ping(&self) -> Result<(), SinkError>;
}
