//! Orchestration of analyze, plan, and run over a source, a sink, and the
//! run ledger.

use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tp_config::{ConfigError, SyncConfig, TallyportConfig};
use tp_core::{
    EntityType, InferredSchema, Record, RunResult, SchemaDelta, SyncError, TableSchema, Watermark,
};
use tp_ledger::Ledger;
use tp_schema::{ddl, is_managed};
use tp_sink::{RowEncoder, TableSink};
use tp_source::{Source, SourceError};

use crate::error::EngineError;
use crate::executor::{ExecutorSettings, Target, UpsertExecutor};
use crate::plan::{Batch, PlanStep, SyncPlan, dependency_order, plan_entity};
use crate::retry::RetryPolicy;

/// Settings a run needs, passed explicitly rather than read from globals.
#[derive(Debug, Clone)]
pub struct SyncContext {
    /// Stamped on every row written.
    pub owner_id: String,
    pub table_prefix: String,
    pub sync: SyncConfig,
}

impl SyncContext {
    /// Build from a loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotConfigured`] when the sink section is
    /// incomplete.
    pub fn from_config(config: &TallyportConfig) -> Result<Self, ConfigError> {
        let sink = config.require_sink()?;
        Ok(Self {
            owner_id: sink.owner_id.clone(),
            table_prefix: sink.table_prefix.clone(),
            sync: config.sync.clone(),
        })
    }

    #[must_use]
    pub fn table(&self, entity_type: EntityType) -> String {
        tp_schema::table_name(&self.table_prefix, entity_type)
    }

    fn policy(&self) -> RetryPolicy {
        RetryPolicy::from_config(&self.sync)
    }
}

/// Reachability of both ends.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    /// Why the source did not answer, if it did not.
    pub source_error: Option<String>,
    pub sink_error: Option<String>,
}

impl HealthReport {
    #[must_use]
    pub const fn is_healthy(&self) -> bool {
        self.source_error.is_none() && self.sink_error.is_none()
    }
}

/// What a sync of one entity type would do to the sink.
#[derive(Debug, Clone, Serialize)]
pub struct EntityAnalysis {
    pub entity_type: EntityType,
    pub table: String,
    pub record_count: usize,
    /// Records that would fail for lack of a natural-key field.
    pub missing_key_count: usize,
    pub schema: Option<InferredSchema>,
    pub delta: Option<SchemaDelta>,
    pub ddl: Vec<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalysisReport {
    pub entities: Vec<EntityAnalysis>,
    pub warnings: Vec<String>,
}

/// Results of one run, one per planned entity type, in plan order.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub results: Vec<RunResult>,
}

impl RunReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.results.iter().all(RunResult::is_clean)
    }

    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.results.iter().map(RunResult::failed_count).sum()
    }
}

pub struct SyncEngine {
    source: Arc<dyn Source>,
    sink: Arc<dyn TableSink>,
    ledger: Ledger,
    context: SyncContext,
}

impl SyncEngine {
    #[must_use]
    pub fn new(
        source: Arc<dyn Source>,
        sink: Arc<dyn TableSink>,
        ledger: Ledger,
        context: SyncContext,
    ) -> Self {
        Self {
            source,
            sink,
            ledger,
            context,
        }
    }

    #[must_use]
    pub const fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    #[must_use]
    pub const fn context(&self) -> &SyncContext {
        &self.context
    }

    /// Ping the source and the sink.
    pub async fn check(&self) -> HealthReport {
        let (source, sink) = tokio::join!(self.source.ping(), self.sink.ping());
        HealthReport {
            source_error: source.err().map(|e| e.to_string()),
            sink_error: sink.err().map(|e| e.to_string()),
        }
    }

    /// Plan `requested` entity types (all of them when empty) in dependency
    /// order, incremental where the ledger allows it.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Ledger` if watermarks cannot be read.
    pub async fn plan(
        &self,
        requested: &[EntityType],
        force_full: bool,
    ) -> Result<SyncPlan, EngineError> {
        let mut steps = Vec::new();
        for entity_type in dependency_order(requested) {
            let watermark = self.ledger.watermark(entity_type).await?;
            let (sync_mode, since) = plan_entity(
                entity_type,
                watermark,
                force_full,
                self.context.sync.incremental_lookback_days,
            );
            steps.push(PlanStep {
                entity_type,
                sync_mode,
                since,
                table: self.context.table(entity_type),
            });
        }
        Ok(SyncPlan { steps })
    }

    /// Fetch, infer, and reconcile without writing anything.
    pub async fn analyze(&self, requested: &[EntityType]) -> AnalysisReport {
        let mut report = AnalysisReport::default();
        for entity_type in dependency_order(requested) {
            let analysis = self.analyze_entity(entity_type).await;
            report.warnings.extend(warnings_for(&analysis));
            report.entities.push(analysis);
        }
        report
    }

    async fn analyze_entity(&self, entity_type: EntityType) -> EntityAnalysis {
        let table = self.context.table(entity_type);
        let mut analysis = EntityAnalysis {
            entity_type,
            table: table.clone(),
            record_count: 0,
            missing_key_count: 0,
            schema: None,
            delta: None,
            ddl: Vec::new(),
            error: None,
        };

        let records = match self.fetch_all(entity_type, None).await {
            Ok(records) => records,
            Err(e) => {
                analysis.error = Some(SyncError::from(e).to_string());
                return analysis;
            }
        };
        analysis.record_count = records.len();
        analysis.missing_key_count = records
            .iter()
            .filter(|r| !r.missing_fields(entity_type.natural_key()).is_empty())
            .count();
        if records.is_empty() {
            return analysis;
        }

        let schema = self.infer_schema(entity_type, &records);
        match self.reconcile(&schema, &table).await {
            Ok((delta, _)) => {
                analysis.ddl = ddl::render(&delta);
                analysis.delta = Some(delta);
            }
            Err(e) => analysis.error = Some(e.to_string()),
        }
        analysis.schema = Some(schema);
        analysis
    }

    /// Plan and run in one call.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Ledger` if the ledger cannot be read or written.
    pub async fn sync(
        &self,
        requested: &[EntityType],
        force_full: bool,
        cancel: &CancellationToken,
    ) -> Result<RunReport, EngineError> {
        let plan = self.plan(requested, force_full).await?;
        self.run(&plan, cancel).await
    }

    /// Execute `plan` step by step.
    ///
    /// A step that fails as a whole (source down, schema conflict) is
    /// recorded as aborted and the next step still runs. Every result is
    /// written to the ledger; a step's watermark advances only when it
    /// finished with no failed record.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Ledger` if the ledger cannot be written. Source
    /// and sink failures never surface here.
    pub async fn run(
        &self,
        plan: &SyncPlan,
        cancel: &CancellationToken,
    ) -> Result<RunReport, EngineError> {
        let run_id = uuid::Uuid::new_v4().to_string();
        tracing::info!(run_id = %run_id, steps = plan.steps.len(), "run started");

        let mut results = Vec::with_capacity(plan.steps.len());
        for step in &plan.steps {
            let started = Watermark::now();
            let result = if cancel.is_cancelled() {
                RunResult::aborted(step.entity_type, step.sync_mode, "cancelled")
            } else {
                self.run_step(step, started, cancel).await
            };

            self.ledger.record_run(&run_id, &result).await?;
            if result.is_clean() {
                self.ledger.advance_watermark(step.entity_type, started).await?;
            }
            tracing::info!(
                entity = %step.entity_type,
                mode = %step.sync_mode,
                attempted = result.attempted_count,
                succeeded = result.succeeded_count,
                failed = result.failed_count(),
                aborted = result.aborted.as_deref().unwrap_or(""),
                "step finished"
            );
            results.push(result);
        }

        Ok(RunReport { run_id, results })
    }

    async fn run_step(
        &self,
        step: &PlanStep,
        started: Watermark,
        cancel: &CancellationToken,
    ) -> RunResult {
        let entity_type = step.entity_type;
        let aborted = |cause: String| {
            let mut result = RunResult::aborted(entity_type, step.sync_mode, cause);
            result.started_at = started.at();
            result
        };

        let records = match self.fetch_all(entity_type, step.since).await {
            Ok(records) => records,
            Err(e) => {
                let err = SyncError::from(e);
                tracing::warn!(entity = %entity_type, error = %err, "fetch failed, skipping entity");
                return aborted(err.to_string());
            }
        };
        if records.is_empty() {
            tracing::info!(entity = %entity_type, "no records");
            let mut result = RunResult::new(entity_type, step.sync_mode);
            result.started_at = started.at();
            return result;
        }

        let target = match self.prepare(entity_type, &step.table, &records).await {
            Ok(target) => target,
            Err(err) => {
                tracing::warn!(entity = %entity_type, error = %err, "schema step failed, skipping entity");
                return aborted(err.to_string());
            }
        };

        let settings = ExecutorSettings {
            chunk_size: self.context.sync.chunk_size,
            parallelism: self.context.sync.parallelism,
            policy: self.context.policy(),
        };
        let executor = UpsertExecutor::new(self.sink.as_ref(), settings, cancel.clone());
        let mut result = executor
            .execute(
                &target,
                Batch {
                    entity_type,
                    sync_mode: step.sync_mode,
                    records,
                },
            )
            .await;
        result.started_at = started.at();
        result
    }

    /// Fetch and collect every record, re-issuing the whole fetch while the
    /// source stays unavailable.
    async fn fetch_all(
        &self,
        entity_type: EntityType,
        since: Option<Watermark>,
    ) -> Result<Vec<Record>, SourceError> {
        let records = self
            .context
            .policy()
            .run(entity_type.as_str(), move || async move {
                let stream = self.source.fetch(entity_type, since).await?;
                stream.collect::<Result<Vec<_>, _>>()
            })
            .await
            .map_err(|e| e.error)?;
        tracing::debug!(entity = %entity_type, records = records.len(), "fetched");
        Ok(records)
    }

    fn infer_schema(&self, entity_type: EntityType, records: &[Record]) -> InferredSchema {
        let mut schema = tp_schema::infer(entity_type, records, self.context.sync.sample_size);
        let sampled = schema.sampled;
        tp_schema::cover_unsampled(&mut schema, &records[sampled..]);
        schema
    }

    async fn describe(&self, table: &str) -> Result<Option<TableSchema>, SyncError> {
        self.context
            .policy()
            .run(table, || self.sink.describe(table))
            .await
            .map_err(|e| e.error.classify())
    }

    async fn reconcile(
        &self,
        schema: &InferredSchema,
        table: &str,
    ) -> Result<(SchemaDelta, Option<TableSchema>), SyncError> {
        let existing = self.describe(table).await?;
        let delta = tp_schema::reconcile(schema, table, existing.as_ref())?;
        Ok((delta, existing))
    }

    /// Infer, reconcile, and migrate the sink table, then build the target
    /// the executor writes to.
    async fn prepare(
        &self,
        entity_type: EntityType,
        table: &str,
        records: &[Record],
    ) -> Result<Target, SyncError> {
        let schema = self.infer_schema(entity_type, records);
        let (delta, existing) = self.reconcile(&schema, table).await?;

        if !delta.is_empty() {
            tracing::info!(
                entity = %entity_type,
                table,
                create = delta.create_table,
                add = delta.columns_to_add.len(),
                widen = delta.columns_to_widen.len(),
                "migrating table"
            );
            self.context
                .policy()
                .run(table, || self.sink.apply(&delta))
                .await
                .map_err(|e| e.error.classify())?;
        }

        let kinds = tp_schema::effective_kinds(&schema, existing.as_ref());
        let columns = schema
            .columns
            .iter()
            .filter(|c| !is_managed(&c.name))
            .map(|c| (c.name.clone(), kinds.get(&c.name).copied().unwrap_or(c.kind)))
            .collect();

        Ok(Target {
            table: table.to_string(),
            conflict: ddl::conflict_columns(entity_type),
            encoder: RowEncoder::new(self.context.owner_id.clone(), columns),
        })
    }
}

fn warnings_for(analysis: &EntityAnalysis) -> Vec<String> {
    let mut warnings = Vec::new();
    if let Some(error) = &analysis.error {
        warnings.push(format!("{}: {error}", analysis.entity_type));
        return warnings;
    }
    if analysis.missing_key_count > 0 {
        warnings.push(format!(
            "{} {} lack a natural key ({}) and will fail",
            analysis.missing_key_count,
            analysis.entity_type.plural(),
            analysis.entity_type.natural_key().join(", ")
        ));
    }
    if analysis.record_count == 0 {
        match analysis.entity_type {
            EntityType::Company => warnings.push("no companies found".into()),
            EntityType::Division => {
                warnings.push("no divisions (cost centres) defined; nothing to sync".into());
            }
            EntityType::Voucher => warnings.push("no vouchers in the selected period".into()),
            _ => {}
        }
    }
    warnings
}
