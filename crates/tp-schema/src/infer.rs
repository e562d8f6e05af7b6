//! Column-level schema inference from a record sample.

use indexmap::IndexMap;
use tp_core::{ColumnSpec, EntityType, InferredSchema, Record, ValueKind};

#[derive(Debug, Clone, Copy)]
struct Observed {
    kind: ValueKind,
    present: usize,
    saw_null: bool,
}

/// Infer a schema from at most `cap` records of `sample`.
///
/// Columns appear in order of first appearance. A column's kind is the
/// widest kind observed; it is nullable if any sampled record omits it or
/// carries a null.
#[must_use]
pub fn infer<'a>(
    entity_type: EntityType,
    sample: impl IntoIterator<Item = &'a Record>,
    cap: usize,
) -> InferredSchema {
    let mut observed: IndexMap<String, Observed> = IndexMap::new();
    let mut sampled = 0usize;

    for record in sample.into_iter().take(cap) {
        sampled += 1;
        for (name, value) in record.fields() {
            let kind = value.kind();
            observed
                .entry(name.to_string())
                .and_modify(|o| {
                    o.kind = o.kind.widen(kind);
                    o.present += 1;
                    o.saw_null |= kind == ValueKind::Null;
                })
                .or_insert(Observed {
                    kind,
                    present: 1,
                    saw_null: kind == ValueKind::Null,
                });
        }
    }

    let columns = observed
        .into_iter()
        .map(|(name, o)| ColumnSpec::new(name, o.kind, o.saw_null || o.present < sampled))
        .collect();

    InferredSchema {
        entity_type,
        columns,
        sampled,
    }
}

/// Add nullable text columns for fields that only appear in records past
/// the sample, so every field of every record has a column to land in.
///
/// Returns the names of the columns added.
pub fn cover_unsampled<'a>(
    schema: &mut InferredSchema,
    records: impl IntoIterator<Item = &'a Record>,
) -> Vec<String> {
    let mut added = Vec::new();
    for record in records {
        for (name, value) in record.fields() {
            if schema.column(name).is_some() {
                continue;
            }
            let kind = if value.kind() == ValueKind::Structured {
                ValueKind::Structured
            } else {
                ValueKind::Text
            };
            schema.columns.push(ColumnSpec::new(name, kind, true));
            added.push(name.to_string());
        }
    }
    if !added.is_empty() {
        tracing::debug!(entity = %schema.entity_type, columns = ?added, "added columns seen past the sample");
    }
    added
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tp_core::Value;

    #[test]
    fn widest_kind_wins() {
        let records = vec![
            Record::new().with("name", "Cash").with("opening_balance", 100_i64),
            Record::new()
                .with("name", "Bank")
                .with("opening_balance", Value::Decimal("12.50".into())),
        ];
        let schema = infer(EntityType::Ledger, &records, 500);
        assert_eq!(
            schema.columns,
            vec![
                ColumnSpec::new("name", ValueKind::Text, false),
                ColumnSpec::new("opening_balance", ValueKind::Decimal, false),
            ]
        );
        assert_eq!(schema.sampled, 2);
    }

    #[test]
    fn absent_or_null_fields_are_nullable() {
        let records = vec![
            Record::new().with("name", "A").with("email", "a@x.in"),
            Record::new().with("name", "B").with("phone", Value::Null),
        ];
        let schema = infer(EntityType::Company, &records, 500);
        assert!(!schema.column("name").unwrap().nullable);
        assert!(schema.column("email").unwrap().nullable);
        let phone = schema.column("phone").unwrap();
        assert!(phone.nullable);
        assert_eq!(phone.kind, ValueKind::Null);
    }

    #[test]
    fn sample_is_capped() {
        let records: Vec<Record> = (0..10_i64)
            .map(|i| {
                if i < 3 {
                    Record::new().with("n", i)
                } else {
                    Record::new().with("n", "late text")
                }
            })
            .collect();
        let schema = infer(EntityType::Group, &records, 3);
        assert_eq!(schema.sampled, 3);
        assert_eq!(schema.column("n").unwrap().kind, ValueKind::Integer);
    }

    #[test]
    fn text_absorbs_other_kinds() {
        let records = vec![
            Record::new().with("x", true),
            Record::new().with("x", "maybe"),
            Record::new().with("x", 3_i64),
        ];
        let schema = infer(EntityType::Group, &records, 10);
        assert_eq!(schema.column("x").unwrap().kind, ValueKind::Text);
    }

    #[test]
    fn date_and_timestamp_widen_to_timestamp() {
        let records = vec![
            Record::new().with("at", chrono::NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()),
            Record::new().with("at", Value::Timestamp(chrono::Utc::now())),
        ];
        let schema = infer(EntityType::Voucher, &records, 10);
        assert_eq!(schema.column("at").unwrap().kind, ValueKind::Timestamp);
    }

    #[test]
    fn inference_is_deterministic() {
        let records: Vec<Record> = (0..50_i64)
            .map(|i| {
                Record::new()
                    .with(format!("f{}", i % 7), i)
                    .with("name", format!("n{i}"))
            })
            .collect();
        assert_eq!(
            infer(EntityType::Ledger, &records, 40),
            infer(EntityType::Ledger, &records, 40)
        );
    }

    #[test]
    fn empty_sample_has_no_columns() {
        let schema = infer(EntityType::Division, &Vec::<Record>::new(), 500);
        assert!(schema.columns.is_empty());
        assert_eq!(schema.sampled, 0);
    }

    #[test]
    fn unsampled_fields_get_text_columns() {
        let records = vec![
            Record::new().with("name", "A"),
            Record::new().with("name", "B").with("gstin", "27AAACA1234A1Z5"),
        ];
        let mut schema = infer(EntityType::Ledger, &records, 1);
        let added = cover_unsampled(&mut schema, &records);
        assert_eq!(added, vec!["gstin".to_string()]);
        assert_eq!(
            schema.column("gstin"),
            Some(&ColumnSpec::new("gstin", ValueKind::Text, true))
        );
    }
}
