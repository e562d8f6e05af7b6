//! Tagged record values and the kind widening lattice.
//!
//! Kinds form a chain, so widening is simply the maximum of two kinds:
//!
//! ```text
//! null < boolean < integer < decimal < date < timestamp < text < structured
//! ```
//!
//! `structured` is stored as serialized text, which is why it sits above
//! `text`: once any record carries a nested value, the column holds JSON text.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// ValueKind
// ---------------------------------------------------------------------------

/// Primitive kind of a value or column. Declaration order is lattice order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Null,
    Boolean,
    Integer,
    Decimal,
    Date,
    Timestamp,
    Text,
    Structured,
}

impl ValueKind {
    pub const ALL: [Self; 8] = [
        Self::Null,
        Self::Boolean,
        Self::Integer,
        Self::Decimal,
        Self::Date,
        Self::Timestamp,
        Self::Text,
        Self::Structured,
    ];

    /// Least upper bound of two kinds.
    #[must_use]
    pub fn widen(self, other: Self) -> Self {
        self.max(other)
    }

    /// True when a column of kind `self` can hold every value of kind `other`.
    #[must_use]
    pub fn covers(self, other: Self) -> bool {
        self.widen(other) == self
    }

    /// PostgreSQL column type used when creating or widening a column.
    ///
    /// A column that only ever saw nulls is created as `text`, the universal
    /// fallback.
    #[must_use]
    pub const fn sql_type(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Integer => "bigint",
            Self::Decimal => "numeric",
            Self::Date => "date",
            Self::Timestamp => "timestamptz",
            Self::Null | Self::Text | Self::Structured => "text",
        }
    }

    /// Map a PostgreSQL type name (as reported by the sink) back into the
    /// lattice. Returns `None` for types the lattice cannot express.
    #[must_use]
    pub fn from_sql_type(sql: &str) -> Option<Self> {
        let normalized = sql.trim().to_ascii_lowercase();
        let base = normalized
            .split('(')
            .next()
            .unwrap_or_default()
            .trim();
        match base {
            "boolean" | "bool" => Some(Self::Boolean),
            "smallint" | "integer" | "int" | "int2" | "int4" | "int8" | "bigint" => {
                Some(Self::Integer)
            }
            "numeric" | "decimal" | "real" | "double precision" | "float4" | "float8" => {
                Some(Self::Decimal)
            }
            "date" => Some(Self::Date),
            "timestamp"
            | "timestamptz"
            | "timestamp with time zone"
            | "timestamp without time zone" => Some(Self::Timestamp),
            "text" | "character varying" | "varchar" | "character" | "char" => Some(Self::Text),
            "json" | "jsonb" => Some(Self::Structured),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Decimal => "decimal",
            Self::Date => "date",
            Self::Timestamp => "timestamp",
            Self::Text => "text",
            Self::Structured => "structured",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// A single field value read from the source.
///
/// Decimals keep their source text so amounts survive without float rounding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Value {
    Null,
    Text(String),
    Integer(i64),
    Decimal(String),
    Boolean(bool),
    Timestamp(DateTime<Utc>),
    Date(NaiveDate),
    Structured(serde_json::Value),
}

impl Value {
    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Null => ValueKind::Null,
            Self::Text(_) => ValueKind::Text,
            Self::Integer(_) => ValueKind::Integer,
            Self::Decimal(_) => ValueKind::Decimal,
            Self::Boolean(_) => ValueKind::Boolean,
            Self::Timestamp(_) => ValueKind::Timestamp,
            Self::Date(_) => ValueKind::Date,
            Self::Structured(_) => ValueKind::Structured,
        }
    }

    /// Null, or text that is empty after trimming.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Canonical textual rendering, used for text columns and key display.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Text(s) | Self::Decimal(s) => s.clone(),
            Self::Integer(i) => i.to_string(),
            Self::Boolean(b) => b.to_string(),
            Self::Timestamp(ts) => ts.to_rfc3339_opts(SecondsFormat::Secs, true),
            Self::Date(d) => d.format("%Y-%m-%d").to_string(),
            Self::Structured(v) => v.to_string(),
        }
    }

    /// JSON representation for a column of the given kind.
    ///
    /// Text and structured columns receive strings, so a value narrower than
    /// its column is rendered rather than sent as a JSON number or boolean.
    #[must_use]
    pub fn to_json_for(&self, column: ValueKind) -> serde_json::Value {
        use serde_json::Value as Json;

        if matches!(self, Self::Null) {
            return Json::Null;
        }
        if matches!(column, ValueKind::Text | ValueKind::Structured) {
            return Json::String(self.render());
        }
        match self {
            Self::Integer(i) => Json::from(*i),
            Self::Boolean(b) => Json::Bool(*b),
            Self::Structured(v) => v.clone(),
            other => Json::String(other.render()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Self::Date(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn text_is_the_fallback_for_scalars() {
        for kind in ValueKind::ALL {
            if kind != ValueKind::Structured {
                assert_eq!(kind.widen(ValueKind::Text), ValueKind::Text);
            }
        }
    }

    #[test]
    fn integer_and_decimal_widen_to_decimal() {
        assert_eq!(
            ValueKind::Integer.widen(ValueKind::Decimal),
            ValueKind::Decimal
        );
    }

    #[test]
    fn date_widens_to_timestamp() {
        assert_eq!(ValueKind::Date.widen(ValueKind::Timestamp), ValueKind::Timestamp);
    }

    #[rstest]
    #[case("numeric", Some(ValueKind::Decimal))]
    #[case("numeric(10,2)", Some(ValueKind::Decimal))]
    #[case("bigint", Some(ValueKind::Integer))]
    #[case("timestamp with time zone", Some(ValueKind::Timestamp))]
    #[case("character varying", Some(ValueKind::Text))]
    #[case("jsonb", Some(ValueKind::Structured))]
    #[case("uuid", None)]
    #[case("bytea", None)]
    fn sql_type_mapping(#[case] sql: &str, #[case] expected: Option<ValueKind>) {
        assert_eq!(ValueKind::from_sql_type(sql), expected);
    }

    #[test]
    fn null_column_is_created_as_text() {
        assert_eq!(ValueKind::Null.sql_type(), "text");
        assert_eq!(ValueKind::Structured.sql_type(), "text");
    }

    #[test]
    fn text_columns_receive_rendered_strings() {
        let v = Value::Integer(42);
        assert_eq!(v.to_json_for(ValueKind::Text), serde_json::json!("42"));
        assert_eq!(v.to_json_for(ValueKind::Decimal), serde_json::json!(42));
    }

    #[test]
    fn structured_values_serialize_into_text_columns() {
        let v = Value::Structured(serde_json::json!({"a": 1}));
        assert_eq!(
            v.to_json_for(ValueKind::Structured),
            serde_json::json!("{\"a\":1}")
        );
    }

    #[test]
    fn blank_detection() {
        assert!(Value::Null.is_blank());
        assert!(Value::from("  ").is_blank());
        assert!(!Value::from("x").is_blank());
        assert!(!Value::Integer(0).is_blank());
    }
}
