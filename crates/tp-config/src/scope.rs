//! Company/division scoping of source queries.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ScopeConfig {
    /// Company context for every non-company query. When unset, the first
    /// company reported by the source is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,

    /// Division (cost centre) the operator works under, stamped for reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub division: Option<String>,
}
