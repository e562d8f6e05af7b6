//! Additive reconciliation of an inferred schema against the sink's table.

use std::collections::HashMap;

use tp_core::{
    ColumnSpec, ColumnWidening, InferredSchema, SchemaDelta, SinkColumnType, TableSchema,
    ValueKind,
};

use crate::error::SchemaError;

/// Columns the sink manages itself. Never added, widened, or written from
/// source data.
pub const MANAGED_COLUMNS: [&str; 4] = ["id", "owner_id", "created_at", "updated_at"];

#[must_use]
pub fn is_managed(column: &str) -> bool {
    MANAGED_COLUMNS.contains(&column)
}

/// Compute the migration that lets `table` hold every inferred column.
///
/// With no existing table, the delta creates it with every inferred column
/// plus any natural-key column the sample lacked. Against an existing table,
/// missing columns are added and narrower columns widened; nothing is ever
/// dropped or narrowed.
///
/// # Errors
///
/// Returns [`SchemaError::Incompatible`] when an existing column's type lies
/// outside the lattice and would have to hold non-null values.
pub fn reconcile(
    inferred: &InferredSchema,
    table: &str,
    existing: Option<&TableSchema>,
) -> Result<SchemaDelta, SchemaError> {
    let entity_type = inferred.entity_type;
    let candidates = inferred.columns.iter().filter(|c| !is_managed(&c.name));

    let Some(existing) = existing else {
        let mut columns: Vec<ColumnSpec> = candidates.cloned().collect();
        for key in entity_type.natural_key() {
            if !columns.iter().any(|c| c.name == *key) {
                columns.push(ColumnSpec::new(*key, ValueKind::Text, true));
            }
        }
        return Ok(SchemaDelta {
            entity_type,
            table: table.to_string(),
            create_table: true,
            columns_to_add: columns,
            columns_to_widen: Vec::new(),
        });
    };

    let mut columns_to_add = Vec::new();
    let mut columns_to_widen = Vec::new();

    for column in candidates {
        match existing.column(&column.name).map(|c| &c.column_type) {
            None => columns_to_add.push(column.clone()),
            Some(SinkColumnType::Known(current)) => {
                if let Some(widening) = widening_for(&column.name, *current, column.kind) {
                    columns_to_widen.push(widening);
                }
            }
            Some(SinkColumnType::Other(sql)) => {
                if column.kind != ValueKind::Null {
                    return Err(SchemaError::Incompatible {
                        entity_type,
                        table: table.to_string(),
                        column: column.name.clone(),
                        existing: sql.clone(),
                        inferred: column.kind,
                    });
                }
            }
        }
    }

    Ok(SchemaDelta {
        entity_type,
        table: table.to_string(),
        create_table: false,
        columns_to_add,
        columns_to_widen,
    })
}

/// A widening is needed only when the current column cannot hold the
/// inferred kind and the two map to different storage types.
fn widening_for(name: &str, current: ValueKind, inferred: ValueKind) -> Option<ColumnWidening> {
    if current.covers(inferred) {
        return None;
    }
    let target = current.widen(inferred);
    if target.sql_type() == current.sql_type() {
        return None;
    }
    Some(ColumnWidening {
        name: name.to_string(),
        from: current,
        to: target,
    })
}

/// Kind each column will have once `delta` is applied, used to encode
/// values for the sink.
#[must_use]
pub fn effective_kinds(
    inferred: &InferredSchema,
    existing: Option<&TableSchema>,
) -> HashMap<String, ValueKind> {
    inferred
        .columns
        .iter()
        .filter(|c| !is_managed(&c.name))
        .map(|column| {
            let current = existing
                .and_then(|t| t.column(&column.name))
                .map(|c| &c.column_type);
            let kind = match current {
                Some(SinkColumnType::Known(k)) => k.widen(column.kind),
                Some(SinkColumnType::Other(_)) => ValueKind::Text,
                None => column.kind,
            };
            (column.name.clone(), kind)
        })
        .collect()
}
