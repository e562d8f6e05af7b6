//! Encoding records into sink rows.

use tp_core::{Record, ValueKind};

/// A JSON object ready for the sink.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Encodes records of one entity type into rows with a uniform key set:
/// `owner_id` followed by every schema column, in schema order. Bulk inserts
/// require every object in a batch to carry the same keys.
#[derive(Debug, Clone)]
pub struct RowEncoder {
    owner_id: String,
    columns: Vec<(String, ValueKind)>,
}

impl RowEncoder {
    #[must_use]
    pub fn new(owner_id: impl Into<String>, columns: Vec<(String, ValueKind)>) -> Self {
        Self {
            owner_id: owner_id.into(),
            columns,
        }
    }

    #[must_use]
    pub fn encode(&self, record: &Record) -> Row {
        let mut row = Row::new();
        row.insert(
            "owner_id".to_string(),
            serde_json::Value::String(self.owner_id.clone()),
        );
        for (name, kind) in &self.columns {
            let value = record
                .get(name)
                .map_or(serde_json::Value::Null, |v| v.to_json_for(*kind));
            row.insert(name.clone(), value);
        }
        row
    }

    #[must_use]
    pub fn encode_all(&self, records: &[Record]) -> Vec<Row> {
        records.iter().map(|r| self.encode(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tp_core::Value;

    fn encoder() -> RowEncoder {
        RowEncoder::new(
            "owner-1",
            vec![
                ("company".into(), ValueKind::Text),
                ("name".into(), ValueKind::Text),
                ("opening_balance".into(), ValueKind::Decimal),
                ("is_revenue".into(), ValueKind::Boolean),
            ],
        )
    }

    #[test]
    fn rows_carry_owner_and_every_column() {
        let record = Record::new()
            .with("company", "Acme")
            .with("name", "Cash")
            .with("opening_balance", 100_i64);
        let row = encoder().encode(&record);
        assert_eq!(
            serde_json::Value::Object(row),
            json!({
                "owner_id": "owner-1",
                "company": "Acme",
                "name": "Cash",
                "opening_balance": 100,
                "is_revenue": null,
            })
        );
    }

    #[test]
    fn decimals_travel_as_strings() {
        let record = Record::new().with("opening_balance", Value::Decimal("-1500.00".into()));
        let row = encoder().encode(&record);
        assert_eq!(row["opening_balance"], json!("-1500.00"));
    }

    #[test]
    fn key_order_is_uniform() {
        let a = encoder().encode(&Record::new().with("name", "A"));
        let b = encoder().encode(&Record::new().with("is_revenue", true).with("company", "X"));
        let keys = |r: &Row| r.keys().cloned().collect::<Vec<_>>();
        assert_eq!(keys(&a), keys(&b));
    }
}
