//! Run ledger location.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

const fn default_keep_runs() -> usize {
    100
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LedgerConfig {
    /// Path of the ledger database. Empty means the per-user data directory.
    #[serde(default)]
    pub path: String,

    /// Results kept per entity type after each sync. 0 keeps everything.
    #[serde(default = "default_keep_runs")]
    pub keep_runs: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            keep_runs: default_keep_runs(),
        }
    }
}

impl LedgerConfig {
    /// Resolved ledger path, or `None` when no data directory is known.
    pub fn resolved_path(&self) -> Option<PathBuf> {
        if self.path.is_empty() {
            dirs::data_dir().map(|p| p.join("tallyport").join("ledger.db"))
        } else {
            Some(PathBuf::from(&self.path))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_wins() {
        let config = LedgerConfig {
            path: "/tmp/ledger.db".into(),
            ..LedgerConfig::default()
        };
        assert_eq!(config.resolved_path(), Some(PathBuf::from("/tmp/ledger.db")));
    }

    #[test]
    fn keeps_a_hundred_results_by_default() {
        assert_eq!(LedgerConfig::default().keep_runs, 100);
    }
}
