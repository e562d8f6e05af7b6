use serde::Serialize;
use serde_json::Value;

use crate::cli::OutputFormat;

pub mod table;

pub use table::Table;

/// A response that can also be shown as a table.
pub trait Tabular {
    fn table(&self) -> Table;
}

/// Render a response to a string in the requested format.
pub fn render<T: Serialize + Tabular>(value: &T, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
        OutputFormat::Table => Ok(value.table().render()),
        OutputFormat::Raw => Ok(serde_json::to_string(value)?),
    }
}

/// Print a response in the requested format.
pub fn output<T: Serialize + Tabular>(value: &T, format: OutputFormat) -> anyhow::Result<()> {
    let rendered = render(value, format)?;
    println!("{rendered}");
    Ok(())
}

/// `key | value` table of any serializable value, nested objects flattened
/// into dotted keys.
pub fn key_value_table<T: Serialize>(value: &T) -> Table {
    let mut table = Table::new(&["key", "value"]);
    let mut entries = Vec::new();
    match serde_json::to_value(value) {
        Ok(json) => flatten("", &json, &mut entries),
        Err(error) => table.note(format!("cannot render: {error}")),
    }
    for (key, value) in entries {
        table.row([key, value]);
    }
    table
}

fn flatten(prefix: &str, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten(&path, child, out);
            }
        }
        other => out.push((prefix.to_string(), cell(other))),
    }
}

/// Display form of one JSON value.
pub fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::from("-"),
        Value::String(v) => v.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde::Serialize;

    use super::*;

    #[derive(Serialize)]
    struct Example {
        id: &'static str,
        nested: Inner,
    }

    #[derive(Serialize)]
    struct Inner {
        port: u16,
        company: Option<String>,
    }

    impl Tabular for Example {
        fn table(&self) -> Table {
            key_value_table(self)
        }
    }

    fn example() -> Example {
        Example {
            id: "x",
            nested: Inner {
                port: 9000,
                company: None,
            },
        }
    }

    #[test]
    fn json_render_is_valid_json() {
        let out = render(&example(), OutputFormat::Json).expect("json render should work");
        let parsed: Value = serde_json::from_str(&out).expect("json should parse");
        assert_eq!(parsed["nested"]["port"], 9000);
    }

    #[test]
    fn raw_render_is_single_line_json() {
        let out = render(&example(), OutputFormat::Raw).expect("raw render should work");
        assert!(!out.contains('\n'));
    }

    #[test]
    fn key_value_table_flattens_sections() {
        let out = render(&example(), OutputFormat::Table).expect("table render should work");
        assert!(out.contains("nested.port"));
        assert!(out.contains("9000"));
        assert!(out.lines().any(|l| l.starts_with("nested.company") && l.ends_with('-')));
    }
}
