//! Entity types and sync modes.
//!
//! All enums use `snake_case` serialization via `#[serde(rename_all = "snake_case")]`.
//! [`EntityType::ALL`] is declared in dependency order: parents before children.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// EntityType
// ---------------------------------------------------------------------------

/// A record category synchronized from the accounting source.
///
/// ```text
/// company → division, group → ledger → voucher → voucher_entry
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Company,
    Division,
    Group,
    Ledger,
    Voucher,
    VoucherEntry,
}

impl EntityType {
    /// Every entity type, in dependency order.
    pub const ALL: [Self; 6] = [
        Self::Company,
        Self::Division,
        Self::Group,
        Self::Ledger,
        Self::Voucher,
        Self::VoucherEntry,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Company => "company",
            Self::Division => "division",
            Self::Group => "group",
            Self::Ledger => "ledger",
            Self::Voucher => "voucher",
            Self::VoucherEntry => "voucher_entry",
        }
    }

    /// Plural form used to derive sink table names.
    #[must_use]
    pub const fn plural(self) -> &'static str {
        match self {
            Self::Company => "companies",
            Self::Division => "divisions",
            Self::Group => "groups",
            Self::Ledger => "ledgers",
            Self::Voucher => "vouchers",
            Self::VoucherEntry => "voucher_entries",
        }
    }

    /// Fields that uniquely identify a record within this entity type.
    #[must_use]
    pub const fn natural_key(self) -> &'static [&'static str] {
        match self {
            Self::Company => &["name"],
            Self::Division | Self::Group | Self::Ledger => &["company", "name"],
            Self::Voucher => &["company", "voucher_number", "voucher_date"],
            Self::VoucherEntry => &["company", "voucher_number", "voucher_date", "line_number"],
        }
    }

    /// Position in the dependency order. Lower ranks sync first.
    ///
    /// Division and Group share a rank: neither references the other.
    #[must_use]
    pub const fn dependency_rank(self) -> u8 {
        match self {
            Self::Company => 0,
            Self::Division | Self::Group => 1,
            Self::Ledger => 2,
            Self::Voucher => 3,
            Self::VoucherEntry => 4,
        }
    }

    /// Entity types whose source query accepts a change-date filter.
    #[must_use]
    pub const fn supports_change_filter(self) -> bool {
        matches!(self, Self::Voucher | Self::VoucherEntry)
    }

    /// Whether source queries for this type are scoped to a company context.
    #[must_use]
    pub const fn is_company_scoped(self) -> bool {
        !matches!(self, Self::Company)
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "company" | "companies" => Ok(Self::Company),
            "division" | "divisions" | "cost_centre" | "cost_center" => Ok(Self::Division),
            "group" | "groups" => Ok(Self::Group),
            "ledger" | "ledgers" => Ok(Self::Ledger),
            "voucher" | "vouchers" => Ok(Self::Voucher),
            "voucher_entry" | "voucher_entries" | "entry" | "entries" => Ok(Self::VoucherEntry),
            other => Err(format!("unknown entity type '{other}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// SyncMode
// ---------------------------------------------------------------------------

/// Whether a plan step re-fetches everything or only the changed window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    Full,
    Incremental,
}

impl SyncMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Incremental => "incremental",
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(Self::Full),
            "incremental" => Ok(Self::Incremental),
            other => Err(format!("unknown sync mode '{other}'")),
        }
    }
}
