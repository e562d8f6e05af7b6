//! # tp-core
//!
//! Core types shared by every tallyport crate.
//!
//! - Entity types with their natural keys and dependency order
//! - Tagged record values and the kind widening lattice
//! - Inferred/existing schema shapes and the additive schema delta
//! - Run results, failure reasons, and watermarks
//! - The cross-crate error taxonomy

pub mod enums;
pub mod errors;
pub mod record;
pub mod run;
pub mod schema;
pub mod value;

pub use enums::{EntityType, SyncMode};
pub use errors::SyncError;
pub use record::Record;
pub use run::{FailedRecord, FailureReason, RunResult, Watermark};
pub use schema::{
    ColumnSpec, ColumnWidening, ExistingColumn, InferredSchema, SchemaDelta, SinkColumnType,
    TableSchema,
};
pub use value::{Value, ValueKind};
