//! Run results, per-record failures, and watermarks.

use chrono::{DateTime, Days, Local, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::enums::{EntityType, SyncMode};
use crate::record::Record;

/// Last successfully completed sync point for an entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Watermark(pub DateTime<Utc>);

impl Watermark {
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    #[must_use]
    pub const fn at(&self) -> DateTime<Utc> {
        self.0
    }

    /// Calendar date of the watermark on this machine's clock. The source
    /// filters on operator-local dates at day granularity.
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.date_in(&Local)
    }

    /// Calendar date of the watermark in `tz`.
    #[must_use]
    pub fn date_in<Tz: TimeZone>(&self, tz: &Tz) -> NaiveDate {
        self.0.with_timezone(tz).date_naive()
    }

    /// The watermark moved `days` earlier. Saturates at the earliest
    /// representable instant.
    #[must_use]
    pub fn rewound(&self, days: u32) -> Self {
        Self(
            self.0
                .checked_sub_days(Days::new(u64::from(days)))
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
        )
    }
}

/// Why a record did not reach the sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum FailureReason {
    /// One or more natural-key fields were absent or blank.
    MissingNaturalKey { fields: Vec<String> },
    /// The sink rejected the record permanently.
    SinkRejected {
        status: Option<u16>,
        message: String,
    },
    /// Transient failures persisted past the retry ceiling.
    RetriesExhausted { attempts: u32, message: String },
    /// The entity's run was cut short before the record was attempted.
    NotAttempted { cause: String },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingNaturalKey { fields } => {
                write!(f, "missing natural key: {}", fields.join(", "))
            }
            Self::SinkRejected {
                status: Some(status),
                message,
            } => write!(f, "rejected by sink ({status}): {message}"),
            Self::SinkRejected {
                status: None,
                message,
            } => write!(f, "rejected by sink: {message}"),
            Self::RetriesExhausted { attempts, message } => {
                write!(f, "gave up after {attempts} attempts: {message}")
            }
            Self::NotAttempted { cause } => write!(f, "not attempted: {cause}"),
        }
    }
}

/// A record paired with the reason it failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedRecord {
    pub record: Record,
    pub reason: FailureReason,
}

/// Outcome of one entity type's run. Persisted for operator inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub entity_type: EntityType,
    pub sync_mode: SyncMode,
    pub attempted_count: usize,
    pub succeeded_count: usize,
    pub failed_records: Vec<FailedRecord>,
    /// Set when the entity's step stopped early (source failure, schema
    /// conflict, cancellation). Other entity types still run.
    pub aborted: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunResult {
    #[must_use]
    pub fn new(entity_type: EntityType, sync_mode: SyncMode) -> Self {
        let now = Utc::now();
        Self {
            entity_type,
            sync_mode,
            attempted_count: 0,
            succeeded_count: 0,
            failed_records: Vec::new(),
            aborted: None,
            started_at: now,
            finished_at: now,
        }
    }

    /// A run that stopped before any record was attempted.
    #[must_use]
    pub fn aborted(entity_type: EntityType, sync_mode: SyncMode, cause: impl Into<String>) -> Self {
        let mut result = Self::new(entity_type, sync_mode);
        result.aborted = Some(cause.into());
        result
    }

    pub fn record_failure(&mut self, record: Record, reason: FailureReason) {
        self.failed_records.push(FailedRecord { record, reason });
    }

    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.failed_records.len()
    }

    /// Every record succeeded and the step ran to completion. Only a clean
    /// run may advance the watermark.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.aborted.is_none() && self.failed_records.is_empty()
    }
}
