//! PostgREST client (Supabase-style REST surface).
//!
//! Every request carries the elevated credential in both `apikey` and
//! `Authorization: Bearer`, which lets it run DDL through a remote procedure
//! and write rows for any owner.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tp_config::SinkConfig;
use tp_core::{ExistingColumn, SchemaDelta, SinkColumnType, TableSchema};

use crate::error::SinkError;
use crate::http::{check_response, transport};
use crate::TableSink;
use crate::row::Row;

pub struct PostgrestSink {
    http: reqwest::Client,
    rest_url: String,
    service_key: String,
    ddl_function: String,
}

impl PostgrestSink {
    /// Build a client from the sink section.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::NotConfigured`] when the URL, elevated credential,
    /// or owner is missing, or [`SinkError::Http`] if the client cannot be built.
    pub fn new(config: &SinkConfig) -> Result<Self, SinkError> {
        if !config.is_configured() {
            return Err(SinkError::NotConfigured(
                "sink.url, sink.service_key and sink.owner_id are required".into(),
            ));
        }
        let http = reqwest::Client::builder()
            .user_agent("tallyport/0.1")
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            rest_url: config.rest_url(),
            service_key: config.service_key.clone(),
            ddl_function: config.ddl_function.clone(),
        })
    }

    fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    async fn openapi(&self) -> Result<OpenApi, SinkError> {
        let url = format!("{}/", self.rest_url);
        let resp = self
            .authorized(self.http.get(&url))
            .header(reqwest::header::ACCEPT, "application/openapi+json")
            .send()
            .await
            .map_err(|e| transport(&e))?;
        let resp = check_response(resp).await?;
        let body = resp.text().await.map_err(|e| transport(&e))?;
        serde_json::from_str(&body).map_err(|e| SinkError::Decode(e.to_string()))
    }
}

#[async_trait]
impl TableSink for PostgrestSink {
    async fn describe(&self, table: &str) -> Result<Option<TableSchema>, SinkError> {
        let doc = self.openapi().await?;
        Ok(doc.table(table))
    }

    async fn apply(&self, delta: &SchemaDelta) -> Result<(), SinkError> {
        let script = tp_schema::ddl::render_script(delta);
        if script.is_empty() {
            return Ok(());
        }
        tracing::info!(
            table = %delta.table,
            create = delta.create_table,
            add = delta.columns_to_add.len(),
            widen = delta.columns_to_widen.len(),
            "applying schema delta"
        );
        let url = format!("{}/rpc/{}", self.rest_url, self.ddl_function);
        let resp = self
            .authorized(self.http.post(&url))
            .json(&serde_json::json!({ "query": script }))
            .send()
            .await
            .map_err(|e| transport(&e))?;
        check_response(resp).await?;
        Ok(())
    }

    async fn upsert(&self, table: &str, conflict: &[&str], rows: &[Row]) -> Result<(), SinkError> {
        if rows.is_empty() {
            return Ok(());
        }
        let url = format!(
            "{}/{}?on_conflict={}",
            self.rest_url,
            urlencoding::encode(table),
            urlencoding::encode(&conflict.join(","))
        );
        tracing::debug!(table, rows = rows.len(), "upserting");
        let resp = self
            .authorized(self.http.post(&url))
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(rows)
            .send()
            .await
            .map_err(|e| transport(&e))?;
        check_response(resp).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), SinkError> {
        self.openapi().await.map(|_| ())
    }
}

// ---------------------------------------------------------------------------
// OpenAPI description
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct OpenApi {
    #[serde(default)]
    definitions: HashMap<String, Definition>,
}

#[derive(Debug, Default, Deserialize)]
struct Definition {
    #[serde(default)]
    properties: serde_json::Map<String, serde_json::Value>,
}

impl OpenApi {
    /// Columns of `table` with their PostgreSQL types, in document order.
    fn table(&self, table: &str) -> Option<TableSchema> {
        let definition = self.definitions.get(table)?;
        let columns = definition
            .properties
            .iter()
            .map(|(name, property)| {
                let sql = property
                    .get("format")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or("text");
                ExistingColumn {
                    name: name.clone(),
                    column_type: SinkColumnType::from_sql(sql),
                }
            })
            .collect();
        Some(TableSchema {
            table: table.to_string(),
            columns,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tp_core::ValueKind;

    const DOC: &str = r#"{
        "swagger": "2.0",
        "definitions": {
            "tally_ledgers": {
                "required": ["id", "owner_id"],
                "properties": {
                    "id": {"format": "uuid", "type": "string"},
                    "owner_id": {"format": "text", "type": "string"},
                    "name": {"format": "text", "type": "string"},
                    "opening_balance": {"format": "bigint", "type": "integer"},
                    "updated_at": {"format": "timestamp with time zone", "type": "string"}
                },
                "type": "object"
            }
        }
    }"#;

    #[test]
    fn reads_table_columns_from_definitions() {
        let doc: OpenApi = serde_json::from_str(DOC).unwrap();
        let table = doc.table("tally_ledgers").unwrap();
        let columns: Vec<(&str, &SinkColumnType)> = table
            .columns
            .iter()
            .map(|c| (c.name.as_str(), &c.column_type))
            .collect();
        assert_eq!(
            columns,
            vec![
                ("id", &SinkColumnType::Other("uuid".into())),
                ("owner_id", &SinkColumnType::Known(ValueKind::Text)),
                ("name", &SinkColumnType::Known(ValueKind::Text)),
                ("opening_balance", &SinkColumnType::Known(ValueKind::Integer)),
                ("updated_at", &SinkColumnType::Known(ValueKind::Timestamp)),
            ]
        );
    }

    #[test]
    fn unknown_table_is_absent() {
        let doc: OpenApi = serde_json::from_str(DOC).unwrap();
        assert!(doc.table("tally_vouchers").is_none());
    }

    #[test]
    fn unconfigured_sink_is_refused() {
        let err = PostgrestSink::new(&SinkConfig::default()).err().unwrap();
        assert!(matches!(err, SinkError::NotConfigured(_)));
    }
}
