use tp_config::TallyportConfig;
use tp_engine::SyncPlan;

use super::when;
use crate::cli::{GlobalFlags, SyncArgs};
use crate::context;
use crate::output::{Table, Tabular, output};

pub async fn handle(
    args: &SyncArgs,
    config: &TallyportConfig,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let engine = context::engine(config).await?;
    let plan = engine.plan(&args.entity.entities, args.full).await?;
    output(&plan, flags.format)
}

impl Tabular for SyncPlan {
    fn table(&self) -> Table {
        let mut table = Table::new(&["step", "entity", "mode", "since", "table"]);
        for (index, step) in self.steps.iter().enumerate() {
            table.row([
                (index + 1).to_string(),
                step.entity_type.to_string(),
                step.sync_mode.to_string(),
                step.since.map_or_else(|| "-".to_string(), |wm| when(wm.at())),
                step.table.clone(),
            ]);
        }
        table
    }
}
