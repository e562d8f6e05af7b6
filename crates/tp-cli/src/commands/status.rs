use serde::Serialize;
use tp_config::TallyportConfig;
use tp_core::{EntityType, FailureReason, Watermark};
use tp_ledger::StoredRun;

use super::when;
use crate::cli::{GlobalFlags, StatusArgs};
use crate::context;
use crate::output::{Table, Tabular, output};

#[derive(Debug, Serialize)]
pub struct EntityStatus {
    pub entity_type: EntityType,
    pub watermark: Option<Watermark>,
    pub last_run: Option<StoredRun>,
}

#[derive(Debug, Serialize)]
pub struct StatusView {
    pub entities: Vec<EntityStatus>,
}

#[derive(Debug, Serialize)]
pub struct FailureRow {
    pub entity_type: EntityType,
    pub run_id: String,
    pub key: String,
    pub reason: FailureReason,
}

#[derive(Debug, Serialize)]
pub struct FailuresView {
    pub failures: Vec<FailureRow>,
}

pub async fn handle(
    args: &StatusArgs,
    config: &TallyportConfig,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let ledger = context::open_ledger(config).await?;
    if let Some(keep) = args.prune {
        let pruned = ledger.prune_runs(keep).await?;
        if !flags.quiet {
            eprintln!("pruned {pruned} old run result(s), keeping {} per entity", keep.max(1));
        }
    }
    let runs = ledger.latest_results().await?;

    if args.failures {
        return output(&failures(&runs), flags.format);
    }

    let watermarks = ledger.watermarks().await?;
    output(&status(runs, &watermarks), flags.format)
}

fn status(runs: Vec<StoredRun>, watermarks: &[(EntityType, Watermark)]) -> StatusView {
    let mut runs = runs;
    let entities = EntityType::ALL
        .into_iter()
        .map(|entity_type| EntityStatus {
            entity_type,
            watermark: watermarks
                .iter()
                .find(|(e, _)| *e == entity_type)
                .map(|(_, wm)| *wm),
            last_run: runs
                .iter()
                .position(|r| r.result.entity_type == entity_type)
                .map(|i| runs.swap_remove(i)),
        })
        .collect();
    StatusView { entities }
}

fn failures(runs: &[StoredRun]) -> FailuresView {
    let failures = runs
        .iter()
        .flat_map(|run| {
            let entity_type = run.result.entity_type;
            run.result.failed_records.iter().map(move |failed| FailureRow {
                entity_type,
                run_id: run.run_id.clone(),
                key: failed.record.key_string(entity_type.natural_key()),
                reason: failed.reason.clone(),
            })
        })
        .collect();
    FailuresView { failures }
}

impl Tabular for StatusView {
    fn table(&self) -> Table {
        let mut table = Table::new(&[
            "entity",
            "watermark",
            "last_run",
            "mode",
            "succeeded",
            "failed",
            "status",
        ]);
        for entity in &self.entities {
            let watermark = entity
                .watermark
                .map_or_else(|| "-".to_string(), |wm| when(wm.at()));
            match &entity.last_run {
                None => table.row([
                    entity.entity_type.to_string(),
                    watermark,
                    "never".into(),
                    "-".into(),
                    "-".into(),
                    "-".into(),
                    "-".into(),
                ]),
                Some(run) => {
                    let result = &run.result;
                    let status = match &result.aborted {
                        Some(cause) => format!("aborted: {cause}"),
                        None if result.failed_records.is_empty() => "ok".to_string(),
                        None => "partial".to_string(),
                    };
                    table.row([
                        entity.entity_type.to_string(),
                        watermark,
                        when(result.finished_at),
                        result.sync_mode.to_string(),
                        result.succeeded_count.to_string(),
                        result.failed_count().to_string(),
                        status,
                    ]);
                }
            }
        }
        table
    }
}

impl Tabular for FailuresView {
    fn table(&self) -> Table {
        let mut table = Table::new(&["entity", "key", "reason"]);
        for failure in &self.failures {
            table.row([
                failure.entity_type.to_string(),
                failure.key.clone(),
                failure.reason.to_string(),
            ]);
        }
        table
    }
}
