//! In-memory doubles for the source and the sink.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tp_config::SyncConfig;
use tp_core::{
    EntityType, ExistingColumn, Record, SchemaDelta, SinkColumnType, TableSchema, Watermark,
};
use tp_engine::{SyncContext, SyncEngine};
use tp_ledger::Ledger;
use tp_sink::{Row, SinkError, TableSink};
use tp_source::{RecordStream, Source, SourceError, record_stream};

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemorySource {
    records: Mutex<HashMap<EntityType, Vec<Record>>>,
    unavailable: Mutex<HashSet<EntityType>>,
    flaky: Mutex<HashMap<EntityType, u32>>,
    pub fetches: Mutex<Vec<(EntityType, Option<Watermark>)>>,
}

impl MemorySource {
    pub fn set(&self, entity: EntityType, records: Vec<Record>) {
        self.records.lock().unwrap().insert(entity, records);
    }

    pub fn make_unavailable(&self, entity: EntityType) {
        self.unavailable.lock().unwrap().insert(entity);
    }

    /// Drop the connection on the next `n` fetches of `entity`.
    pub fn fail_next_fetches(&self, entity: EntityType, n: u32) {
        self.flaky.lock().unwrap().insert(entity, n);
    }

    pub fn fetch_log(&self) -> Vec<(EntityType, Option<Watermark>)> {
        self.fetches.lock().unwrap().clone()
    }
}

#[async_trait]
impl Source for MemorySource {
    async fn fetch(
        &self,
        entity: EntityType,
        since: Option<Watermark>,
    ) -> Result<RecordStream, SourceError> {
        self.fetches.lock().unwrap().push((entity, since));
        if self.unavailable.lock().unwrap().contains(&entity) {
            return Err(SourceError::Unavailable("connection refused".into()));
        }
        if let Some(remaining) = self.flaky.lock().unwrap().get_mut(&entity) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(SourceError::Unavailable("connection reset by peer".into()));
            }
        }
        let records = self
            .records
            .lock()
            .unwrap()
            .get(&entity)
            .cloned()
            .unwrap_or_default();
        Ok(record_stream(records))
    }

    async fn ping(&self) -> Result<(), SourceError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sink
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertCall {
    pub table: String,
    pub rows: usize,
}

#[derive(Default)]
pub struct MemorySink {
    schemas: Mutex<HashMap<String, TableSchema>>,
    rows: Mutex<HashMap<String, BTreeMap<String, Row>>>,
    calls: Mutex<Vec<UpsertCall>>,
    applied: Mutex<Vec<SchemaDelta>>,
    transient_failures: Mutex<u32>,
    reject: Mutex<Option<(String, serde_json::Value)>>,
    cancel_on_upsert: Mutex<Option<CancellationToken>>,
}

impl MemorySink {
    /// Pretend `table` already exists with `columns` as `(name, sql type)`.
    pub fn with_table(&self, table: &str, columns: &[(&str, &str)]) {
        let schema = TableSchema {
            table: table.to_string(),
            columns: columns
                .iter()
                .map(|(name, sql)| ExistingColumn {
                    name: (*name).to_string(),
                    column_type: SinkColumnType::from_sql(sql),
                })
                .collect(),
        };
        self.schemas.lock().unwrap().insert(table.to_string(), schema);
    }

    /// Fail the next `n` upserts as if the network dropped.
    pub fn fail_next(&self, n: u32) {
        *self.transient_failures.lock().unwrap() = n;
    }

    /// Reject, permanently, any upsert carrying a row whose `column` equals `value`.
    pub fn reject_rows_where(&self, column: &str, value: serde_json::Value) {
        *self.reject.lock().unwrap() = Some((column.to_string(), value));
    }

    /// Cancel `token` during the first upsert.
    pub fn cancel_during_first_upsert(&self, token: CancellationToken) {
        *self.cancel_on_upsert.lock().unwrap() = Some(token);
    }

    pub fn calls(&self) -> Vec<UpsertCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, table: &str) -> usize {
        self.calls().iter().filter(|c| c.table == table).count()
    }

    pub fn applied(&self) -> Vec<SchemaDelta> {
        self.applied.lock().unwrap().clone()
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.rows.lock().unwrap().get(table).map_or(0, BTreeMap::len)
    }

    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.rows
            .lock()
            .unwrap()
            .get(table)
            .map(|t| t.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn column_type(&self, table: &str, column: &str) -> Option<SinkColumnType> {
        self.schemas
            .lock()
            .unwrap()
            .get(table)
            .and_then(|t| t.column(column))
            .map(|c| c.column_type.clone())
    }
}

#[async_trait]
impl TableSink for MemorySink {
    async fn describe(&self, table: &str) -> Result<Option<TableSchema>, SinkError> {
        Ok(self.schemas.lock().unwrap().get(table).cloned())
    }

    async fn apply(&self, delta: &SchemaDelta) -> Result<(), SinkError> {
        self.applied.lock().unwrap().push(delta.clone());
        let mut schemas = self.schemas.lock().unwrap();
        let schema = schemas
            .entry(delta.table.clone())
            .or_insert_with(|| TableSchema {
                table: delta.table.clone(),
                columns: vec![
                    ExistingColumn {
                        name: "id".into(),
                        column_type: SinkColumnType::from_sql("uuid"),
                    },
                    ExistingColumn {
                        name: "owner_id".into(),
                        column_type: SinkColumnType::from_sql("text"),
                    },
                ],
            });
        for column in &delta.columns_to_add {
            schema.columns.push(ExistingColumn {
                name: column.name.clone(),
                column_type: SinkColumnType::from_sql(column.kind.sql_type()),
            });
        }
        for widening in &delta.columns_to_widen {
            if let Some(existing) = schema.columns.iter_mut().find(|c| c.name == widening.name) {
                existing.column_type = SinkColumnType::from_sql(widening.to.sql_type());
            }
        }
        Ok(())
    }

    async fn upsert(&self, table: &str, conflict: &[&str], rows: &[Row]) -> Result<(), SinkError> {
        self.calls.lock().unwrap().push(UpsertCall {
            table: table.to_string(),
            rows: rows.len(),
        });
        if let Some(token) = self.cancel_on_upsert.lock().unwrap().take() {
            token.cancel();
        }
        {
            let mut remaining = self.transient_failures.lock().unwrap();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(SinkError::Transport("connection reset by peer".into()));
            }
        }
        if let Some((column, value)) = self.reject.lock().unwrap().as_ref() {
            if rows.iter().any(|row| row.get(column) == Some(value)) {
                return Err(SinkError::Api {
                    status: 400,
                    message: "23514: row violates check constraint".into(),
                });
            }
        }

        let mut tables = self.rows.lock().unwrap();
        let stored = tables.entry(table.to_string()).or_default();
        for row in rows {
            let key = conflict
                .iter()
                .map(|c| row.get(*c).map(ToString::to_string).unwrap_or_default())
                .collect::<Vec<_>>()
                .join("|");
            stored.insert(key, row.clone());
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), SinkError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub struct Harness {
    pub source: Arc<MemorySource>,
    pub sink: Arc<MemorySink>,
    pub engine: SyncEngine,
}

pub fn context(chunk_size: usize, parallelism: usize) -> SyncContext {
    SyncContext {
        owner_id: "owner-1".into(),
        table_prefix: "tally_".into(),
        sync: SyncConfig {
            chunk_size,
            parallelism,
            base_delay_ms: 1,
            max_delay_ms: 2,
            ..SyncConfig::default()
        },
    }
}

pub async fn harness(chunk_size: usize, parallelism: usize) -> Harness {
    let source = Arc::new(MemorySource::default());
    let sink = Arc::new(MemorySink::default());
    let ledger = Ledger::open_local(":memory:").await.unwrap();
    let engine = SyncEngine::new(
        Arc::clone(&source) as Arc<dyn Source>,
        Arc::clone(&sink) as Arc<dyn TableSink>,
        ledger,
        context(chunk_size, parallelism),
    );
    Harness {
        source,
        sink,
        engine,
    }
}

pub fn company(name: &str) -> Record {
    Record::new().with("name", name).with("guid", format!("guid-{name}"))
}

pub fn ledger(name: Option<&str>, opening: &str) -> Record {
    let mut record = Record::new().with("company", "Acme Traders");
    if let Some(name) = name {
        record.insert("name", name);
    }
    record.insert("parent", "Sundry Debtors");
    record.insert("opening_balance", tp_source::scalar::infer(opening));
    record
}

pub fn ledgers(n: usize) -> Vec<Record> {
    (0..n)
        .map(|i| ledger(Some(&format!("Ledger {i}")), "100"))
        .collect()
}

pub fn voucher(number: i64) -> Record {
    Record::new()
        .with("company", "Acme Traders")
        .with("voucher_number", number)
        .with("voucher_date", chrono::NaiveDate::from_ymd_opt(2024, 4, 5).unwrap())
        .with("voucher_type", "Sales")
}

pub fn entry(number: i64, line: i64) -> Record {
    voucher(number)
        .with("line_number", line)
        .with("ledger_name", "Cash")
        .with("amount", tp_source::scalar::infer("-1180.00"))
}
