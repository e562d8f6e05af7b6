//! Accounting source (Tally XML/HTTP endpoint) configuration.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

fn default_host() -> String {
    String::from("localhost")
}

const fn default_port() -> u16 {
    9000
}

const fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    /// Host running the accounting application.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port of the XML/HTTP interface.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Per-request timeout, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Start of the voucher window for full syncs. Unbounded when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_date: Option<NaiveDate>,

    /// End of the voucher window. Defaults to today at request time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_date: Option<NaiveDate>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout_secs: default_timeout_secs(),
            from_date: None,
            to_date: None,
        }
    }
}

impl SourceConfig {
    /// Base URL of the source endpoint.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}
