use std::path::PathBuf;

use anyhow::Context;
use serde::Serialize;
use tp_config::TallyportConfig;

use crate::cli::{ConfigCommands, GlobalFlags, InitArgs};
use crate::output::{Table, Tabular, key_value_table, output};

#[derive(Debug, Serialize)]
pub struct InitView {
    pub path: PathBuf,
    pub sink_configured: bool,
}

pub fn handle(
    action: &ConfigCommands,
    config: TallyportConfig,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    match action {
        ConfigCommands::Show => output(&config.redacted(), flags.format),
        ConfigCommands::Init(args) => {
            let updated = apply(config, args);
            let path = if args.project {
                let path = PathBuf::from(".tallyport/config.toml");
                updated.save_to(&path)?;
                path
            } else {
                updated.save_user().context("failed to write user config")?
            };
            output(
                &InitView {
                    path,
                    sink_configured: updated.sink.is_configured(),
                },
                flags.format,
            )
        }
    }
}

/// Overlay the values given on the command line.
fn apply(mut config: TallyportConfig, args: &InitArgs) -> TallyportConfig {
    if let Some(url) = &args.url {
        config.sink.url.clone_from(url);
    }
    if let Some(key) = &args.service_key {
        config.sink.service_key.clone_from(key);
    }
    if let Some(key) = &args.anon_key {
        config.sink.anon_key.clone_from(key);
    }
    if let Some(owner) = &args.owner_id {
        config.sink.owner_id.clone_from(owner);
    }
    if let Some(host) = &args.host {
        config.source.host.clone_from(host);
    }
    if let Some(port) = args.port {
        config.source.port = port;
    }
    if args.company.is_some() {
        config.scope.company.clone_from(&args.company);
    }
    if args.division.is_some() {
        config.scope.division.clone_from(&args.division);
    }
    config
}

impl Tabular for TallyportConfig {
    fn table(&self) -> Table {
        key_value_table(self)
    }
}

impl Tabular for InitView {
    fn table(&self) -> Table {
        let mut table = key_value_table(self);
        if !self.sink_configured {
            table.note("sink still needs url, service_key, and owner_id before syncing");
        }
        table
    }
}
