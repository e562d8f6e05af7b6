use tp_config::TallyportConfig;

use crate::cli::{Commands, GlobalFlags};

pub mod analyze;
pub mod check;
pub mod config;
pub mod plan;
pub mod status;
pub mod sync;

/// Dispatch a parsed command to the corresponding handler module.
pub async fn dispatch(
    command: Commands,
    config: TallyportConfig,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    match command {
        Commands::Check => check::handle(&config, flags).await,
        Commands::Analyze(args) => analyze::handle(&args, &config, flags).await,
        Commands::Plan(args) => plan::handle(&args, &config, flags).await,
        Commands::Sync(args) => sync::handle(&args, &config, flags).await,
        Commands::Status(args) => status::handle(&args, &config, flags).await,
        Commands::Config { action } => config::handle(&action, config, flags),
    }
}

/// Short timestamp for tables.
fn when(at: chrono::DateTime<chrono::Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}
