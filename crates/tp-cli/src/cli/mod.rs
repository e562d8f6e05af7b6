use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tp_core::EntityType;

pub mod global;

pub use global::{GlobalFlags, OutputFormat};

/// Top-level CLI parser for the `tallyport` binary.
#[derive(Debug, Parser)]
#[command(
    name = "tallyport",
    version,
    about = "Sync Tally masters and vouchers into a hosted Postgres"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format: json, table, raw
    #[arg(short, long, global = true, default_value = "table")]
    pub format: OutputFormat,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Extra config file, layered above the user and project files
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Extract ergonomic global flags struct for command handlers.
    #[must_use]
    pub fn global_flags(&self) -> GlobalFlags {
        GlobalFlags {
            format: self.format,
            quiet: self.quiet,
            verbose: self.verbose,
            config: self.config.clone(),
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Check that the Tally source and the sink are reachable
    Check,
    /// Sample the source, infer schemas, and show the pending migrations
    Analyze(EntityArgs),
    /// Show the ordered sync plan
    Plan(SyncArgs),
    /// Run a sync. Ctrl-C stops after the chunks in flight
    Sync(SyncArgs),
    /// Show the last run of each entity type
    Status(StatusArgs),
    /// Inspect or write configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Debug, Clone, Args)]
pub struct EntityArgs {
    /// Entity type to include (repeatable; default: all)
    #[arg(short, long = "entity")]
    pub entities: Vec<EntityType>,
}

#[derive(Debug, Clone, Args)]
pub struct SyncArgs {
    #[command(flatten)]
    pub entity: EntityArgs,

    /// Ignore watermarks and re-fetch everything
    #[arg(long)]
    pub full: bool,
}

#[derive(Debug, Clone, Args)]
pub struct StatusArgs {
    /// List the failed records of each last run
    #[arg(long)]
    pub failures: bool,

    /// Delete all but the newest KEEP results of each entity type first
    #[arg(long, value_name = "KEEP")]
    pub prune: Option<usize>,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration with secrets masked
    Show,
    /// Write connection settings to the user config file
    Init(InitArgs),
}

#[derive(Debug, Clone, Default, Args)]
pub struct InitArgs {
    /// Sink project URL
    #[arg(long)]
    pub url: Option<String>,
    /// Elevated (service role) key
    #[arg(long)]
    pub service_key: Option<String>,
    /// Restricted (anon) key
    #[arg(long)]
    pub anon_key: Option<String>,
    /// Owner identifier stamped on every row
    #[arg(long)]
    pub owner_id: Option<String>,
    /// Tally host
    #[arg(long)]
    pub host: Option<String>,
    /// Tally port
    #[arg(long)]
    pub port: Option<u16>,
    /// Company to sync (default: the first one Tally lists)
    #[arg(long)]
    pub company: Option<String>,
    /// Division (cost centre) scope
    #[arg(long)]
    pub division: Option<String>,
    /// Write `.tallyport/config.toml` in the current directory instead
    #[arg(long)]
    pub project: bool,
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};
    use pretty_assertions::assert_eq;
    use tp_core::EntityType;

    use super::{Cli, Commands, ConfigCommands, OutputFormat};

    #[test]
    fn clap_command_tree_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_parse_before_subcommand() {
        let cli = Cli::try_parse_from(["tallyport", "--format", "json", "--verbose", "check"])
            .expect("cli should parse");
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Check));
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from(["tallyport", "status", "--format", "raw", "--quiet"])
            .expect("cli should parse");
        assert_eq!(cli.format, OutputFormat::Raw);
        assert!(cli.quiet);
    }

    #[test]
    fn sync_accepts_repeated_entities_and_aliases() {
        let cli = Cli::try_parse_from([
            "tallyport",
            "sync",
            "--entity",
            "vouchers",
            "-e",
            "cost-centre",
            "--full",
        ])
        .expect("cli should parse");
        let Commands::Sync(args) = cli.command else {
            panic!("expected sync");
        };
        assert_eq!(
            args.entity.entities,
            vec![EntityType::Voucher, EntityType::Division]
        );
        assert!(args.full);
    }

    #[test]
    fn status_takes_a_retention_count() {
        let cli = Cli::try_parse_from(["tallyport", "status", "--prune", "10"])
            .expect("cli should parse");
        let Commands::Status(args) = cli.command else {
            panic!("expected status");
        };
        assert_eq!(args.prune, Some(10));
        assert!(!args.failures);
        assert!(Cli::try_parse_from(["tallyport", "status", "--prune", "-1"]).is_err());
    }

    #[test]
    fn unknown_entity_is_rejected() {
        assert!(Cli::try_parse_from(["tallyport", "plan", "--entity", "stock_item"]).is_err());
    }

    #[test]
    fn output_format_rejects_invalid_value() {
        assert!(Cli::try_parse_from(["tallyport", "--format", "xml", "check"]).is_err());
    }

    #[test]
    fn config_init_takes_connection_settings() {
        let cli = Cli::try_parse_from([
            "tallyport",
            "config",
            "init",
            "--url",
            "https://demo.supabase.co",
            "--owner-id",
            "owner-1",
            "--port",
            "9002",
        ])
        .expect("cli should parse");
        let Commands::Config {
            action: ConfigCommands::Init(args),
        } = cli.command
        else {
            panic!("expected config init");
        };
        assert_eq!(args.url.as_deref(), Some("https://demo.supabase.co"));
        assert_eq!(args.port, Some(9002));
        assert!(!args.project);
    }
}
