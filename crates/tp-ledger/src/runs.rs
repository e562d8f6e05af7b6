//! Run result repository.

use serde::Serialize;
use tp_core::{EntityType, FailedRecord, RunResult};

use crate::Ledger;
use crate::error::LedgerError;
use crate::helpers::{count_from_sql, count_to_sql, parse_datetime, parse_enum};

/// A persisted [`RunResult`] with its ledger row id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredRun {
    pub id: i64,
    pub run_id: String,
    #[serde(flatten)]
    pub result: RunResult,
}

const RESULT_COLUMNS: &str = "id, run_id, entity_type, sync_mode, attempted_count, \
     succeeded_count, aborted, started_at, finished_at";

impl Ledger {
    /// Persist one entity type's result together with its failed records.
    ///
    /// Returns the new result's row id.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError` if serialization or any insert fails. Nothing
    /// is written in that case.
    pub async fn record_run(&self, run_id: &str, result: &RunResult) -> Result<i64, LedgerError> {
        let tx = self.conn.transaction().await?;
        tx.execute(
            "INSERT INTO run_results (run_id, entity_type, sync_mode, attempted_count,
                 succeeded_count, failed_count, aborted, started_at, finished_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            libsql::params![
                run_id,
                result.entity_type.as_str(),
                result.sync_mode.as_str(),
                count_to_sql(result.attempted_count),
                count_to_sql(result.succeeded_count),
                count_to_sql(result.failed_count()),
                result.aborted.clone(),
                result.started_at.to_rfc3339(),
                result.finished_at.to_rfc3339(),
            ],
        )
        .await?;
        let result_id = tx.last_insert_rowid();

        for (position, failed) in result.failed_records.iter().enumerate() {
            tx.execute(
                "INSERT INTO failed_records (result_id, position, record, reason)
                 VALUES (?1, ?2, ?3, ?4)",
                libsql::params![
                    result_id,
                    count_to_sql(position),
                    serde_json::to_string(&failed.record)?,
                    serde_json::to_string(&failed.reason)?,
                ],
            )
            .await?;
        }
        tx.commit().await?;

        tracing::debug!(
            run_id,
            result_id,
            entity = %result.entity_type,
            failed = result.failed_count(),
            "run result recorded"
        );
        Ok(result_id)
    }

    /// Most recent result of every entity type that has one, in dependency
    /// order, failed records included.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError` if a query fails or a stored row is corrupt.
    pub async fn latest_results(&self) -> Result<Vec<StoredRun>, LedgerError> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {RESULT_COLUMNS} FROM run_results
                     WHERE id IN (SELECT MAX(id) FROM run_results GROUP BY entity_type)"
                ),
                (),
            )
            .await?;
        let mut runs = Vec::new();
        while let Some(row) = rows.next().await? {
            runs.push(row_to_run(&row)?);
        }
        for run in &mut runs {
            run.result.failed_records = self.failed_records(run.id).await?;
        }
        runs.sort_by_key(|run| run.result.entity_type);
        Ok(runs)
    }

    /// Every result written under `run_id`, in the order recorded.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError` if a query fails or a stored row is corrupt.
    pub async fn run(&self, run_id: &str) -> Result<Vec<StoredRun>, LedgerError> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {RESULT_COLUMNS} FROM run_results WHERE run_id = ?1 ORDER BY id"),
                [run_id],
            )
            .await?;
        let mut runs = Vec::new();
        while let Some(row) = rows.next().await? {
            runs.push(row_to_run(&row)?);
        }
        for run in &mut runs {
            run.result.failed_records = self.failed_records(run.id).await?;
        }
        Ok(runs)
    }

    /// Failed records of one stored result, in their original order.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError` if the query fails or a stored record is corrupt.
    pub async fn failed_records(&self, result_id: i64) -> Result<Vec<FailedRecord>, LedgerError> {
        let mut rows = self
            .conn
            .query(
                "SELECT record, reason FROM failed_records
                 WHERE result_id = ?1 ORDER BY position",
                [result_id],
            )
            .await?;
        let mut failed = Vec::new();
        while let Some(row) = rows.next().await? {
            failed.push(FailedRecord {
                record: serde_json::from_str(&row.get::<String>(0)?)?,
                reason: serde_json::from_str(&row.get::<String>(1)?)?,
            });
        }
        Ok(failed)
    }

    /// Keep the newest `keep` results of each entity type (at least one) and
    /// delete older ones with their failed records.
    ///
    /// Returns how many results were deleted.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError` if a delete fails. Nothing is deleted in that case.
    pub async fn prune_runs(&self, keep: usize) -> Result<u64, LedgerError> {
        let keep = count_to_sql(keep.max(1));
        let tx = self.conn.transaction().await?;
        tx.execute(
            "DELETE FROM failed_records WHERE result_id IN (
                 SELECT r.id FROM run_results r
                 WHERE (SELECT COUNT(*) FROM run_results n
                        WHERE n.entity_type = r.entity_type AND n.id > r.id) >= ?1)",
            [keep],
        )
        .await?;
        let pruned = tx
            .execute(
                "DELETE FROM run_results WHERE id IN (
                     SELECT r.id FROM run_results r
                     WHERE (SELECT COUNT(*) FROM run_results n
                            WHERE n.entity_type = r.entity_type AND n.id > r.id) >= ?1)",
                [keep],
            )
            .await?;
        tx.commit().await?;

        if pruned > 0 {
            tracing::info!(pruned, keep, "pruned old run results");
        }
        Ok(pruned)
    }
}

fn row_to_run(row: &libsql::Row) -> Result<StoredRun, LedgerError> {
    let entity_type: EntityType = parse_enum(&row.get::<String>(2)?)?;
    Ok(StoredRun {
        id: row.get::<i64>(0)?,
        run_id: row.get::<String>(1)?,
        result: RunResult {
            entity_type,
            sync_mode: parse_enum(&row.get::<String>(3)?)?,
            attempted_count: count_from_sql(row.get::<i64>(4)?),
            succeeded_count: count_from_sql(row.get::<i64>(5)?),
            failed_records: Vec::new(),
            aborted: row.get::<Option<String>>(6)?,
            started_at: parse_datetime(&row.get::<String>(7)?)?,
            finished_at: parse_datetime(&row.get::<String>(8)?)?,
        },
    })
}
