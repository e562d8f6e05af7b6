use tp_config::TallyportConfig;
use tp_engine::HealthReport;
use tp_source::Source;

use crate::cli::GlobalFlags;
use crate::context;
use crate::output::{Table, Tabular, output};

pub async fn handle(config: &TallyportConfig, flags: &GlobalFlags) -> anyhow::Result<()> {
    let report = if config.sink.is_configured() {
        context::engine(config).await?.check().await
    } else {
        let source = context::source(config)?;
        HealthReport {
            source_error: source.ping().await.err().map(|e| e.to_string()),
            sink_error: Some("not configured; run 'tallyport config init'".into()),
        }
    };

    output(&report, flags.format)?;
    if !report.is_healthy() {
        anyhow::bail!("connection check failed");
    }
    Ok(())
}

impl Tabular for HealthReport {
    fn table(&self) -> Table {
        let mut table = Table::new(&["endpoint", "status", "detail"]);
        for (endpoint, error) in [("source", &self.source_error), ("sink", &self.sink_error)] {
            match error {
                None => table.row([endpoint, "ok", ""]),
                Some(error) => table.row([endpoint, "error", error.as_str()]),
            }
        }
        table
    }
}
