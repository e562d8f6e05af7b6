//! # tp-config
//!
//! Layered configuration loading for tallyport using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`TALLYPORT_*` prefix, `__` as separator)
//! 2. Project-level `.tallyport/config.toml`
//! 3. User-level `~/.config/tallyport/config.toml`
//! 4. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `TALLYPORT_SINK__URL` -> `sink.url`,
//! `TALLYPORT_SCOPE__COMPANY` -> `scope.company`, etc.
//!
//! # Usage
//!
//! ```no_run
//! use tp_config::TallyportConfig;
//!
//! let config = TallyportConfig::load_with_dotenv().expect("config");
//! if config.sink.is_configured() {
//!     println!("Sink: {}", config.sink.url);
//! }
//! ```

mod error;
mod ledger;
mod scope;
mod sink;
mod source;
mod sync;

pub use error::ConfigError;
pub use ledger::LedgerConfig;
pub use scope::ScopeConfig;
pub use sink::SinkConfig;
pub use source::SourceConfig;
pub use sync::SyncConfig;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TallyportConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub sink: SinkConfig,
    #[serde(default)]
    pub scope: ScopeConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
}

impl TallyportConfig {
    /// Load configuration from all sources (TOML files + environment variables).
    ///
    /// Does NOT call `dotenvy` -- use [`Self::load_with_dotenv`] if you need
    /// `.env` file loading.
    pub fn load() -> Result<Self, ConfigError> {
        Self::figment().extract::<Self>()?.validated()
    }

    /// Load configuration with `.env` file support from the current directory.
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::load()
    }

    /// Load with an explicit config file layered above the user and project
    /// files but below the environment.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::base_figment()
            .merge(Toml::file(path))
            .merge(Self::env_provider())
            .extract::<Self>()?
            .validated()
    }

    /// Build the figment provider chain.
    ///
    /// Public so tests can inspect the figment directly or add providers on top.
    pub fn figment() -> Figment {
        Self::base_figment().merge(Self::env_provider())
    }

    fn base_figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Layer 1: User-global config
        if let Some(global_path) = Self::user_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        // Layer 2: Project-local config
        let local_path = PathBuf::from(".tallyport/config.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        figment
    }

    fn env_provider() -> Env {
        Env::prefixed("TALLYPORT_").split("__")
    }

    /// Path to the user-global config file.
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("tallyport").join("config.toml"))
    }

    /// Persist connection settings to the user-global config file.
    pub fn save_user(&self) -> Result<PathBuf, ConfigError> {
        let path = Self::user_config_path().ok_or(ConfigError::NoConfigDir)?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Write this configuration as TOML, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let rendered = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, rendered).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reject values the engine cannot run with.
    fn validated(self) -> Result<Self, ConfigError> {
        if self.sync.chunk_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "sync.chunk_size".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.sync.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "sync.max_attempts".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.sync.parallelism == 0 {
            return Err(ConfigError::InvalidValue {
                field: "sync.parallelism".into(),
                reason: "must be at least 1".into(),
            });
        }
        if let (Some(from), Some(to)) = (self.source.from_date, self.source.to_date) {
            if from > to {
                return Err(ConfigError::InvalidValue {
                    field: "source.from_date".into(),
                    reason: format!("{from} is after source.to_date {to}"),
                });
            }
        }
        Ok(self)
    }

    /// Fail unless the sink section can be used for a sync.
    pub fn require_sink(&self) -> Result<&SinkConfig, ConfigError> {
        if self.sink.is_configured() {
            Ok(&self.sink)
        } else {
            Err(ConfigError::NotConfigured {
                section: "sink".into(),
            })
        }
    }

    /// Copy with secrets masked, for display.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.sink.service_key = mask(&copy.sink.service_key);
        copy.sink.anon_key = mask(&copy.sink.anon_key);
        copy
    }
}

fn mask(secret: &str) -> String {
    if secret.is_empty() {
        return String::new();
    }
    let visible: String = secret.chars().take(6).collect();
    format!("{visible}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_loads() {
        let config = TallyportConfig::default();
        assert!(!config.sink.is_configured());
        assert!(config.scope.company.is_none());
        assert_eq!(config.sync.chunk_size, 200);
    }

    #[test]
    fn figment_builds_without_files() {
        figment::Jail::expect_with(|_jail| {
            let config: TallyportConfig = TallyportConfig::figment().extract()?;
            assert_eq!(config.source.port, 9000);
            assert_eq!(config.sink.table_prefix, "tally_");
            Ok(())
        });
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let mut config = TallyportConfig::default();
        config.sync.chunk_size = 0;
        let err = config.validated().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "sync.chunk_size"));
    }

    #[test]
    fn require_sink_reports_section() {
        let err = TallyportConfig::default().require_sink().unwrap_err();
        assert!(matches!(err, ConfigError::NotConfigured { ref section } if section == "sink"));
    }

    #[test]
    fn redaction_masks_keys() {
        let mut config = TallyportConfig::default();
        config.sink.service_key = "eyJhbGciOiJIUzI1NiJ9.secret".into();
        let shown = config.redacted();
        assert_eq!(shown.sink.service_key, "eyJhbG...");
        assert!(shown.sink.anon_key.is_empty());
    }
}
