//! Schema error types.

use thiserror::Error;
use tp_core::{EntityType, SyncError, ValueKind};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    /// An existing column's type has no place in the widening lattice.
    #[error("column {table}.{column} has type {existing}, which cannot hold {inferred} values")]
    Incompatible {
        entity_type: EntityType,
        table: String,
        column: String,
        existing: String,
        inferred: ValueKind,
    },
}

impl From<SchemaError> for SyncError {
    fn from(err: SchemaError) -> Self {
        match err {
            SchemaError::Incompatible {
                entity_type,
                column,
                existing,
                inferred,
                ..
            } => Self::IncompatibleSchema {
                entity_type,
                column,
                existing,
                inferred,
            },
        }
    }
}
