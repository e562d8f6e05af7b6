//! # tp-schema
//!
//! From sampled records to sink DDL:
//!
//! 1. [`infer`] types each field by widening over the sample
//! 2. [`reconcile`] diffs the inferred schema against the sink's table into
//!    an additive [`SchemaDelta`](tp_core::SchemaDelta)
//! 3. [`ddl::render`] turns the delta into PostgreSQL statements

pub mod ddl;
pub mod infer;
pub mod reconcile;

mod error;

pub use error::SchemaError;
pub use infer::{cover_unsampled, infer};
pub use reconcile::{MANAGED_COLUMNS, effective_kinds, is_managed, reconcile};

use tp_core::EntityType;

/// Sink table name of an entity type under `prefix`.
#[must_use]
pub fn table_name(prefix: &str, entity_type: EntityType) -> String {
    format!("{prefix}{}", entity_type.plural())
}
