//! # tp-source
//!
//! Source adapter for a Tally accounting instance reached over its
//! XML-over-HTTP interface.
//!
//! - [`request`] builds collection and day book request envelopes
//! - [`clean`] repairs characters the source emits but XML forbids
//! - [`parse`] turns a response into a lazy stream of [`Record`]s, flattening
//!   voucher ledger entries into their own records
//! - [`TallyClient`] implements [`Source`] against a live instance

pub mod clean;
pub mod parse;
pub mod request;
pub mod scalar;
pub mod tags;

mod client;
mod error;

pub use client::TallyClient;
pub use error::SourceError;
pub use parse::TallyRecords;

use async_trait::async_trait;
use tp_core::{EntityType, Record, Watermark};

/// Lazily produced records of one entity type. Yields at most one error, last.
pub type RecordStream = Box<dyn Iterator<Item = Result<Record, SourceError>> + Send>;

/// Producer of records for an entity type.
#[async_trait]
pub trait Source: Send + Sync {
    /// Fetch every record of `entity`, or only those changed on or after
    /// `since` when the entity type supports a change filter.
    async fn fetch(
        &self,
        entity: EntityType,
        since: Option<Watermark>,
    ) -> Result<RecordStream, SourceError>;

    /// Check that the source is reachable and answering.
    async fn ping(&self) -> Result<(), SourceError>;
}

/// Wrap records already in memory as a [`RecordStream`].
#[must_use]
pub fn record_stream(records: Vec<Record>) -> RecordStream {
    Box::new(records.into_iter().map(Ok))
}
