//! Semi-structured records produced by the source adapter.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Field name → value mapping for one source record.
///
/// Field order is the order the source emitted them, which keeps schema
/// inference deterministic. Records are built once by the adapter and only
/// read afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: IndexMap<String, Value>,
}

impl Record {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert or replace a field, keeping its original position on replace.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Key fields that are absent, null, or blank text.
    #[must_use]
    pub fn missing_fields(&self, key: &[&str]) -> Vec<String> {
        key.iter()
            .filter(|field| self.get(field).is_none_or(Value::is_blank))
            .map(|field| (*field).to_string())
            .collect()
    }

    /// Render the given key fields as `a|b|c`, for logs and failure listings.
    #[must_use]
    pub fn key_string(&self, key: &[&str]) -> String {
        key.iter()
            .map(|field| self.get(field).map(Value::render).unwrap_or_default())
            .collect::<Vec<_>>()
            .join("|")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn preserves_insertion_order() {
        let record = Record::new()
            .with("name", "Cash")
            .with("parent", "Cash-in-Hand")
            .with("guid", "g-1");
        let names: Vec<&str> = record.fields().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["name", "parent", "guid"]);
    }

    #[test]
    fn missing_fields_reports_absent_and_blank() {
        let record = Record::new()
            .with("company", "Acme")
            .with("voucher_number", "  ");
        assert_eq!(
            record.missing_fields(&["company", "voucher_number", "voucher_date"]),
            vec!["voucher_number".to_string(), "voucher_date".to_string()]
        );
    }

    #[test]
    fn key_string_joins_rendered_values() {
        let record = Record::new().with("company", "Acme").with("line_number", 3_i64);
        assert_eq!(record.key_string(&["company", "line_number"]), "Acme|3");
    }

    #[test]
    fn serializes_as_plain_map() {
        let record = Record::new().with("name", "Acme");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"name": {"kind": "text", "value": "Acme"}})
        );
    }
}
