//! Sync planning: which entity types run, in what order, and how much of
//! each one is fetched.

use serde::Serialize;
use tp_core::{EntityType, Record, SyncMode, Watermark};

/// One entity type's step in a [`SyncPlan`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanStep {
    pub entity_type: EntityType,
    pub sync_mode: SyncMode,
    /// Lower bound of the fetch. `None` for full syncs.
    pub since: Option<Watermark>,
    /// Sink table the step writes to.
    pub table: String,
}

/// Steps in dependency order: parents always precede their children.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncPlan {
    pub steps: Vec<PlanStep>,
}

impl SyncPlan {
    #[must_use]
    pub fn entity_types(&self) -> Vec<EntityType> {
        self.steps.iter().map(|s| s.entity_type).collect()
    }
}

/// Records of one entity type ready for the executor, in source order.
#[derive(Debug, Clone)]
pub struct Batch {
    pub entity_type: EntityType,
    pub sync_mode: SyncMode,
    pub records: Vec<Record>,
}

/// Decide the mode of one entity type's step.
///
/// Incremental applies only when a previous run left a watermark and the
/// source can filter the entity type by date; everything else is re-fetched
/// in full. `force_full` overrides both. The source filters on the voucher
/// date rather than when the voucher was entered, so the lower bound sits
/// `lookback_days` before the watermark. Vouchers back-dated further than
/// that need a full run.
#[must_use]
pub fn plan_entity(
    entity_type: EntityType,
    watermark: Option<Watermark>,
    force_full: bool,
    lookback_days: u32,
) -> (SyncMode, Option<Watermark>) {
    match watermark {
        Some(since) if !force_full && entity_type.supports_change_filter() => {
            (SyncMode::Incremental, Some(since.rewound(lookback_days)))
        }
        _ => (SyncMode::Full, None),
    }
}

/// Deduplicate `requested` and put it in dependency order, whatever order
/// the caller asked in. An empty request means every entity type.
#[must_use]
pub fn dependency_order(requested: &[EntityType]) -> Vec<EntityType> {
    if requested.is_empty() {
        return EntityType::ALL.to_vec();
    }
    let mut ordered: Vec<EntityType> = requested.to_vec();
    ordered.sort_by_key(|e| (e.dependency_rank(), *e));
    ordered.dedup();
    ordered
}
