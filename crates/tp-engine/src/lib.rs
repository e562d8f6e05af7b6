//! # tp-engine
//!
//! Sync planner, upsert executor, and the [`SyncEngine`] that drives a run:
//!
//! ```text
//! plan ─► fetch ─► infer ─► reconcile/migrate ─► upsert ─► ledger
//! ```
//!
//! Entity types run one after another in dependency order. Within one entity
//! type, chunks are written with bounded parallelism.

pub mod executor;
pub mod plan;
pub mod retry;

mod engine;
mod error;

pub use engine::{
    AnalysisReport, EntityAnalysis, HealthReport, RunReport, SyncContext, SyncEngine,
};
pub use error::EngineError;
pub use executor::{ExecutorSettings, Target, UpsertExecutor};
pub use plan::{Batch, PlanStep, SyncPlan, dependency_order, plan_entity};
pub use retry::{Retryable, RetryPolicy};
pub use tokio_util::sync::CancellationToken;
