//! Hosted datastore (PostgREST-style REST surface) configuration.

use serde::{Deserialize, Serialize};

fn default_table_prefix() -> String {
    String::from("tally_")
}

fn default_ddl_function() -> String {
    String::from("exec_sql")
}

const fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SinkConfig {
    /// Project URL (e.g., `https://abc.supabase.co`).
    #[serde(default)]
    pub url: String,

    /// Elevated credential. Can alter tables and bypasses row ownership.
    #[serde(default)]
    pub service_key: String,

    /// Restricted credential. Kept for operator reference, never used to sync.
    #[serde(default)]
    pub anon_key: String,

    /// Owner identifier stamped on every synchronized row.
    #[serde(default)]
    pub owner_id: String,

    /// Prefix for every synchronized table name.
    #[serde(default = "default_table_prefix")]
    pub table_prefix: String,

    /// Remote procedure that executes DDL on behalf of the elevated credential.
    #[serde(default = "default_ddl_function")]
    pub ddl_function: String,

    /// Per-request timeout, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            service_key: String::new(),
            anon_key: String::new(),
            owner_id: String::new(),
            table_prefix: default_table_prefix(),
            ddl_function: default_ddl_function(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl SinkConfig {
    /// Check if the sink has the minimum required fields for syncing.
    pub fn is_configured(&self) -> bool {
        !self.url.is_empty() && !self.service_key.is_empty() && !self.owner_id.is_empty()
    }

    /// REST root, without a trailing slash.
    pub fn rest_url(&self) -> String {
        format!("{}/rest/v1", self.url.trim_end_matches('/'))
    }
}
