use tp_config::TallyportConfig;
use tp_engine::{CancellationToken, RunReport};

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

    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("cancelling: finishing chunks in flight");
                cancel.cancel();
            }
        })
    };
    let report = engine.sync(&args.entity.entities, args.full, &cancel).await;
    watcher.abort();
    let report = report?;
    if config.ledger.keep_runs > 0 {
        engine.ledger().prune_runs(config.ledger.keep_runs).await?;
    }

    output(&report, flags.format)?;

    if !report.is_clean() {
        let aborted = report.results.iter().filter(|r| r.aborted.is_some()).count();
        anyhow::bail!(
            "run {} incomplete: {} failed record(s), {aborted} aborted step(s); see 'tallyport status --failures'",
            report.run_id,
            report.failed_count()
        );
    }
    Ok(())
}

impl Tabular for RunReport {
    fn table(&self) -> Table {
        let mut table = Table::new(&[
            "entity",
            "mode",
            "attempted",
            "succeeded",
            "failed",
            "finished",
            "status",
        ]);
        for result in &self.results {
            let status = match &result.aborted {
                Some(cause) => format!("aborted: {cause}"),
                None if result.failed_records.is_empty() => "ok".to_string(),
                None => "partial".to_string(),
            };
            table.row([
                result.entity_type.to_string(),
                result.sync_mode.to_string(),
                result.attempted_count.to_string(),
                result.succeeded_count.to_string(),
                result.failed_count().to_string(),
                when(result.finished_at),
                status,
            ]);
        }
        table.note(format!("run {}", self.run_id));
        table
    }
}
