//! Cross-cutting error taxonomy for tallyport.
//!
//! Crate-specific errors (`SourceError`, `SinkError`, ...) live in their own
//! crates and classify into [`SyncError`] at the engine boundary, where the
//! propagation policy is decided.

use thiserror::Error;

use crate::enums::EntityType;
use crate::value::ValueKind;

/// Failure classes of a synchronization run.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncError {
    /// The source could not be reached or dropped the connection.
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    /// The source answered with an application-level error.
    #[error("source rejected the request: {0}")]
    SourceRejected(String),

    /// An existing column cannot hold the inferred kind.
    #[error("incompatible schema for {entity_type}.{column}: existing {existing}, inferred {inferred}")]
    IncompatibleSchema {
        entity_type: EntityType,
        column: String,
        existing: String,
        inferred: ValueKind,
    },

    /// Network or timeout class failure at the sink; retried with backoff.
    #[error("sink transient failure: {0}")]
    SinkTransientFailure(String),

    /// Validation or conflict class failure at the sink; isolated per record.
    #[error("sink permanent failure: {0}")]
    SinkPermanentFailure(String),

    /// A record lacks one or more natural-key fields.
    #[error("record validation failed for {entity_type}: missing natural key ({})", fields.join(", "))]
    RecordValidationFailure {
        entity_type: EntityType,
        fields: Vec<String>,
    },
}

impl SyncError {
    /// Whether retrying the same operation may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::SourceUnavailable(_) | Self::SinkTransientFailure(_))
    }

    /// Whether the failure ends the current entity type's step.
    #[must_use]
    pub const fn aborts_entity(&self) -> bool {
        matches!(
            self,
            Self::SourceUnavailable(_) | Self::SourceRejected(_) | Self::IncompatibleSchema { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert!(SyncError::SinkTransientFailure("timeout".into()).is_transient());
        assert!(!SyncError::SinkPermanentFailure("409".into()).is_transient());
        assert!(SyncError::SourceRejected("no company".into()).aborts_entity());
        assert!(
            !SyncError::RecordValidationFailure {
                entity_type: EntityType::Ledger,
                fields: vec!["name".into()],
            }
            .aborts_entity()
        );
    }

    #[test]
    fn incompatible_schema_message_names_column() {
        let err = SyncError::IncompatibleSchema {
            entity_type: EntityType::Company,
            column: "guid".into(),
            existing: "uuid".into(),
            inferred: ValueKind::Text,
        };
        assert_eq!(
            err.to_string(),
            "incompatible schema for company.guid: existing uuid, inferred text"
        );
    }
}
