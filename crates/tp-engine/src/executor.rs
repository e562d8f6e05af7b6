//! Upsert executor: chunked, retried, failure-isolating writes of one
//! entity type's batch.

use chrono::Utc;
use futures_util::{StreamExt, stream};
use tokio_util::sync::CancellationToken;
use tp_core::{FailedRecord, FailureReason, Record, RunResult};
use tp_sink::{Row, RowEncoder, TableSink};

use crate::plan::Batch;
use crate::retry::{Exhausted, RetryPolicy};

/// Where and how a batch is written.
#[derive(Debug, Clone)]
pub struct Target {
    pub table: String,
    /// Upsert conflict columns: `owner_id` followed by the natural key.
    pub conflict: Vec<&'static str>,
    pub encoder: RowEncoder,
}

/// Tunables of one executor.
#[derive(Debug, Clone, Copy)]
pub struct ExecutorSettings {
    pub chunk_size: usize,
    pub parallelism: usize,
    pub policy: RetryPolicy,
}

pub struct UpsertExecutor<'a> {
    sink: &'a dyn TableSink,
    settings: ExecutorSettings,
    cancel: CancellationToken,
}

enum ChunkOutcome {
    Done {
        succeeded: usize,
        failed: Vec<FailedRecord>,
    },
    /// Cancellation was observed before the chunk started.
    Skipped(Vec<Record>),
}

impl<'a> UpsertExecutor<'a> {
    #[must_use]
    pub fn new(sink: &'a dyn TableSink, settings: ExecutorSettings, cancel: CancellationToken) -> Self {
        Self {
            sink,
            settings,
            cancel,
        }
    }

    /// Write `batch` to `target` and account for every record.
    ///
    /// Records missing a natural-key field never reach the sink. The rest
    /// are written in chunks, up to `parallelism` chunks in flight. A chunk
    /// that fails transiently is retried whole; a chunk that still fails is
    /// split and each record retried alone, so one bad record only fails
    /// itself. Cancellation is observed between chunks; chunks not yet
    /// started are reported as not attempted and the result is marked
    /// aborted.
    ///
    /// `attempted_count` always equals `succeeded_count + failed_count()`.
    pub async fn execute(&self, target: &Target, batch: Batch) -> RunResult {
        let entity = batch.entity_type;
        let mut result = RunResult::new(entity, batch.sync_mode);
        result.attempted_count = batch.records.len();

        let key = entity.natural_key();
        let mut valid = Vec::with_capacity(batch.records.len());
        for record in batch.records {
            let missing = record.missing_fields(key);
            if missing.is_empty() {
                valid.push(record);
            } else {
                tracing::warn!(
                    entity = %entity,
                    key = %record.key_string(key),
                    fields = ?missing,
                    "record missing natural key"
                );
                result.record_failure(record, FailureReason::MissingNaturalKey { fields: missing });
            }
        }

        let chunks = into_chunks(valid, self.settings.chunk_size.max(1));
        let total = chunks.len();
        tracing::debug!(entity = %entity, table = %target.table, chunks = total, "writing batch");

        let outcomes: Vec<ChunkOutcome> = stream::iter(chunks.into_iter().enumerate())
            .map(|(index, chunk)| self.run_chunk(target, index, chunk))
            .buffered(self.settings.parallelism.max(1))
            .collect()
            .await;

        let mut skipped = 0usize;
        for outcome in outcomes {
            match outcome {
                ChunkOutcome::Done { succeeded, failed } => {
                    result.succeeded_count += succeeded;
                    result.failed_records.extend(failed);
                }
                ChunkOutcome::Skipped(records) => {
                    skipped += records.len();
                    for record in records {
                        result.record_failure(
                            record,
                            FailureReason::NotAttempted {
                                cause: "cancelled".into(),
                            },
                        );
                    }
                }
            }
        }
        if skipped > 0 {
            tracing::warn!(entity = %entity, records = skipped, "cancelled before all chunks ran");
            result.aborted = Some("cancelled".into());
        }

        result.finished_at = Utc::now();
        result
    }

    async fn run_chunk(&self, target: &Target, index: usize, chunk: Vec<Record>) -> ChunkOutcome {
        if self.cancel.is_cancelled() {
            return ChunkOutcome::Skipped(chunk);
        }
        let scope = format!("{}#{index}", target.table);
        let rows = target.encoder.encode_all(&chunk);

        match self
            .settings
            .policy
            .run(&scope, || self.sink.upsert(&target.table, &target.conflict, &rows))
            .await
        {
            Ok(()) => {
                tracing::debug!(table = %target.table, chunk = index, records = chunk.len(), "chunk written");
                ChunkOutcome::Done {
                    succeeded: chunk.len(),
                    failed: Vec::new(),
                }
            }
            Err(exhausted) if chunk.len() == 1 => ChunkOutcome::Done {
                succeeded: 0,
                failed: chunk
                    .into_iter()
                    .map(|record| FailedRecord {
                        record,
                        reason: failure_reason(&exhausted),
                    })
                    .collect(),
            },
            Err(exhausted) => {
                tracing::warn!(
                    table = %target.table,
                    chunk = index,
                    records = chunk.len(),
                    error = %exhausted.error,
                    "chunk failed, retrying records individually"
                );
                self.isolate(target, &scope, chunk, rows).await
            }
        }
    }

    async fn isolate(
        &self,
        target: &Target,
        scope: &str,
        chunk: Vec<Record>,
        rows: Vec<Row>,
    ) -> ChunkOutcome {
        let mut succeeded = 0;
        let mut failed = Vec::new();
        for (record, row) in chunk.into_iter().zip(rows) {
            let single = std::slice::from_ref(&row);
            match self
                .settings
                .policy
                .run(scope, || self.sink.upsert(&target.table, &target.conflict, single))
                .await
            {
                Ok(()) => succeeded += 1,
                Err(exhausted) => {
                    let reason = failure_reason(&exhausted);
                    tracing::warn!(table = %target.table, reason = %reason, "record failed");
                    failed.push(FailedRecord { record, reason });
                }
            }
        }
        ChunkOutcome::Done { succeeded, failed }
    }
}

fn failure_reason(exhausted: &Exhausted) -> FailureReason {
    if exhausted.error.is_transient() {
        FailureReason::RetriesExhausted {
            attempts: exhausted.attempts,
            message: exhausted.error.to_string(),
        }
    } else {
        FailureReason::SinkRejected {
            status: exhausted.error.status(),
            message: exhausted.error.to_string(),
        }
    }
}

fn into_chunks(records: Vec<Record>, size: usize) -> Vec<Vec<Record>> {
    let mut chunks = Vec::with_capacity(records.len().div_ceil(size));
    let mut iter = records.into_iter().peekable();
    while iter.peek().is_some() {
        chunks.push(iter.by_ref().take(size).collect());
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| Record::new().with("name", format!("R{i}")))
            .collect()
    }

    #[test]
    fn chunks_keep_source_order() {
        let chunks = into_chunks(records(5), 2);
        let sizes: Vec<usize> = chunks.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        assert_eq!(chunks[2][0].get("name").map(tp_core::Value::render), Some("R4".into()));
    }

    #[test]
    fn no_records_no_chunks() {
        assert!(into_chunks(Vec::new(), 200).is_empty());
    }

    #[test]
    fn exhausted_transient_errors_report_attempts() {
        let reason = failure_reason(&Exhausted {
            error: tp_sink::SinkError::Transport("timed out".into()),
            attempts: 3,
        });
        assert!(matches!(reason, FailureReason::RetriesExhausted { attempts: 3, .. }));
    }

    #[test]
    fn permanent_errors_keep_their_status() {
        let reason = failure_reason(&Exhausted {
            error: tp_sink::SinkError::Api {
                status: 400,
                message: "22P02: invalid input syntax for type numeric".into(),
            },
            attempts: 1,
        });
        assert!(matches!(reason, FailureReason::SinkRejected { status: Some(400), .. }));
    }
}
