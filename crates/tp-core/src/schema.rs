//! Schema shapes: what inference produces, what the sink reports, and the
//! additive delta between them.

use serde::{Deserialize, Serialize};

use crate::enums::EntityType;
use crate::value::ValueKind;

/// One inferred column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: ValueKind,
    pub nullable: bool,
}

impl ColumnSpec {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ValueKind, nullable: bool) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable,
        }
    }
}

/// Column-level schema inferred from a record sample. Column names are unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferredSchema {
    pub entity_type: EntityType,
    pub columns: Vec<ColumnSpec>,
    /// Number of records that contributed to the inference.
    pub sampled: usize,
}

impl InferredSchema {
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Column type as reported by the sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "name")]
pub enum SinkColumnType {
    /// A type that maps onto the widening lattice.
    Known(ValueKind),
    /// A type outside the lattice (e.g. `uuid`, `bytea`), kept verbatim.
    Other(String),
}

impl SinkColumnType {
    #[must_use]
    pub fn from_sql(sql: &str) -> Self {
        ValueKind::from_sql_type(sql).map_or_else(|| Self::Other(sql.to_string()), Self::Known)
    }
}

/// A column that already exists in the sink table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingColumn {
    pub name: String,
    pub column_type: SinkColumnType,
}

/// The sink's current definition of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub table: String,
    pub columns: Vec<ExistingColumn>,
}

impl TableSchema {
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ExistingColumn> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// A column whose type must move up the lattice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnWidening {
    pub name: String,
    pub from: ValueKind,
    pub to: ValueKind,
}

/// Additive migration for one entity's table. Never removes or narrows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDelta {
    pub entity_type: EntityType,
    pub table: String,
    /// The table does not exist yet; `columns_to_add` is its full column list.
    pub create_table: bool,
    pub columns_to_add: Vec<ColumnSpec>,
    pub columns_to_widen: Vec<ColumnWidening>,
}

impl SchemaDelta {
    /// No DDL is required.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.create_table && self.columns_to_add.is_empty() && self.columns_to_widen.is_empty()
    }
}
