use tp_config::TallyportConfig;
use tp_engine::AnalysisReport;

use crate::cli::{EntityArgs, GlobalFlags};
use crate::context;
use crate::output::{Table, Tabular, output};

pub async fn handle(
    args: &EntityArgs,
    config: &TallyportConfig,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let engine = context::engine(config).await?;
    let report = engine.analyze(&args.entities).await;
    output(&report, flags.format)
}

impl Tabular for AnalysisReport {
    fn table(&self) -> Table {
        let mut table = Table::new(&["entity", "table", "records", "no_key", "columns", "action"]);
        for entity in &self.entities {
            let columns = entity
                .schema
                .as_ref()
                .map_or_else(|| "-".to_string(), |s| s.columns.len().to_string());
            let action = match (&entity.error, &entity.delta) {
                (Some(_), _) => "error".to_string(),
                (None, Some(delta)) if delta.create_table => "create table".to_string(),
                (None, Some(delta)) if !delta.is_empty() => format!(
                    "add {}, widen {}",
                    delta.columns_to_add.len(),
                    delta.columns_to_widen.len()
                ),
                _ => "none".to_string(),
            };
            table.row([
                entity.entity_type.to_string(),
                entity.table.clone(),
                entity.record_count.to_string(),
                entity.missing_key_count.to_string(),
                columns,
                action,
            ]);
        }
        for warning in &self.warnings {
            table.note(format!("warning: {warning}"));
        }
        for entity in self.entities.iter().filter(|e| !e.ddl.is_empty()) {
            table.note(format!("-- {}", entity.table));
            for statement in &entity.ddl {
                table.note(format!("{statement};"));
            }
        }
        table
    }
}
