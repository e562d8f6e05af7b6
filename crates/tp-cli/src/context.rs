//! Building the engine and its collaborators from configuration.

use std::sync::Arc;

use anyhow::Context;
use tp_config::{ConfigError, TallyportConfig};
use tp_engine::{SyncContext, SyncEngine};
use tp_ledger::Ledger;
use tp_sink::PostgrestSink;
use tp_source::TallyClient;

use crate::cli::GlobalFlags;

pub fn load_config(flags: &GlobalFlags) -> Result<TallyportConfig, ConfigError> {
    match &flags.config {
        Some(path) => TallyportConfig::load_from(path),
        None => TallyportConfig::load_with_dotenv(),
    }
}

pub async fn open_ledger(config: &TallyportConfig) -> anyhow::Result<Ledger> {
    let path = config
        .ledger
        .resolved_path()
        .context("no per-user data directory; set ledger.path")?;
    Ledger::open_file(&path)
        .await
        .with_context(|| format!("failed to open run ledger at {}", path.display()))
}

pub fn source(config: &TallyportConfig) -> anyhow::Result<TallyClient> {
    TallyClient::new(&config.source, &config.scope).context("failed to build source client")
}

pub async fn engine(config: &TallyportConfig) -> anyhow::Result<SyncEngine> {
    let context = SyncContext::from_config(config)
        .context("sink is not configured; run 'tallyport config init'")?;
    let sink = PostgrestSink::new(&config.sink).context("failed to build sink client")?;
    let ledger = open_ledger(config).await?;
    Ok(SyncEngine::new(
        Arc::new(source(config)?),
        Arc::new(sink),
        ledger,
        context,
    ))
}
