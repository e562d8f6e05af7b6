//! PostgreSQL DDL for a [`SchemaDelta`].
//!
//! Created tables carry a surrogate `id`, the `owner_id` stamped on every
//! row, audit timestamps, a unique constraint on `owner_id` plus the natural
//! key (the upsert conflict target), and a row-level security policy that
//! limits restricted-credential access to the owner's rows.

use tp_core::{ColumnSpec, EntityType, SchemaDelta};

/// Conflict target for upserts: the owner column followed by the natural key.
#[must_use]
pub fn conflict_columns(entity_type: EntityType) -> Vec<&'static str> {
    std::iter::once("owner_id")
        .chain(entity_type.natural_key().iter().copied())
        .collect()
}

/// Quote an identifier, doubling embedded quotes.
#[must_use]
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Statements that apply `delta`, in execution order. Empty for an empty delta.
#[must_use]
pub fn render(delta: &SchemaDelta) -> Vec<String> {
    if delta.is_empty() {
        return Vec::new();
    }
    let table = quote_ident(&delta.table);
    let mut statements = Vec::new();

    if delta.create_table {
        statements.push(create_table(delta, &table));
        let policy = quote_ident(&format!("{}_owner", delta.table));
        statements.push(format!("ALTER TABLE {table} ENABLE ROW LEVEL SECURITY"));
        statements.push(format!("DROP POLICY IF EXISTS {policy} ON {table}"));
        statements.push(format!(
            "CREATE POLICY {policy} ON {table} FOR ALL \
             USING (auth.uid()::text = \"owner_id\") \
             WITH CHECK (auth.uid()::text = \"owner_id\")"
        ));
    } else {
        for column in &delta.columns_to_add {
            statements.push(format!(
                "ALTER TABLE {table} ADD COLUMN IF NOT EXISTS {}",
                column_definition(column)
            ));
        }
        statements.push(ensure_natural_key(delta));
    }

    for widening in &delta.columns_to_widen {
        let column = quote_ident(&widening.name);
        let sql_type = widening.to.sql_type();
        statements.push(format!(
            "ALTER TABLE {table} ALTER COLUMN {column} TYPE {sql_type} USING {column}::{sql_type}"
        ));
    }

    // PostgREST caches the schema; new columns are invisible until reloaded.
    statements.push("NOTIFY pgrst, 'reload schema'".to_string());
    statements
}

/// All statements joined into one script.
#[must_use]
pub fn render_script(delta: &SchemaDelta) -> String {
    render(delta)
        .into_iter()
        .map(|s| format!("{s};"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Add the natural-key constraint unless the table already has one of that
/// name. Fails when stored rows already hold duplicate keys.
fn ensure_natural_key(delta: &SchemaDelta) -> String {
    let table = quote_ident(&delta.table);
    let constraint = constraint_name(&delta.table);
    format!(
        "DO $$ BEGIN \
         IF NOT EXISTS (SELECT 1 FROM pg_constraint \
         WHERE conname = {} AND conrelid = {}::regclass) THEN \
         ALTER TABLE {table} ADD CONSTRAINT {} UNIQUE ({}); \
         END IF; END $$",
        quote_literal(&constraint),
        quote_literal(&table),
        quote_ident(&constraint),
        key_list(delta.entity_type)
    )
}

fn constraint_name(table: &str) -> String {
    format!("{table}_natural_key")
}

fn key_list(entity_type: EntityType) -> String {
    conflict_columns(entity_type)
        .into_iter()
        .map(quote_ident)
        .collect::<Vec<_>>()
        .join(", ")
}

fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

fn column_definition(column: &ColumnSpec) -> String {
    format!("{} {}", quote_ident(&column.name), column.kind.sql_type())
}

fn create_table(delta: &SchemaDelta, table: &str) -> String {
    let mut lines = vec![
        "\"id\" uuid PRIMARY KEY DEFAULT gen_random_uuid()".to_string(),
        "\"owner_id\" text NOT NULL".to_string(),
    ];
    lines.extend(delta.columns_to_add.iter().map(column_definition));
    lines.push("\"created_at\" timestamptz NOT NULL DEFAULT now()".to_string());
    lines.push("\"updated_at\" timestamptz NOT NULL DEFAULT now()".to_string());

    lines.push(format!(
        "CONSTRAINT {} UNIQUE ({})",
        quote_ident(&constraint_name(&delta.table)),
        key_list(delta.entity_type)
    ));

    format!(
        "CREATE TABLE IF NOT EXISTS {table} (\n  {}\n)",
        lines.join(",\n  ")
    )
}
