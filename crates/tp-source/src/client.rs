//! HTTP client for the accounting source's XML interface.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::OnceCell;
use tp_config::{ScopeConfig, SourceConfig};
use tp_core::{EntityType, Record, Watermark};

use crate::clean::clean_response;
use crate::error::SourceError;
use crate::parse::TallyRecords;
use crate::request::{DateWindow, build_request};
use crate::{RecordStream, Source};

/// Client for a running Tally instance.
pub struct TallyClient {
    http: reqwest::Client,
    base_url: String,
    window: SourceWindow,
    configured_company: Option<String>,
    resolved_company: OnceCell<String>,
    division: Option<String>,
}

#[derive(Debug, Clone, Copy)]
struct SourceWindow {
    from: Option<chrono::NaiveDate>,
    to: Option<chrono::NaiveDate>,
}

impl TallyClient {
    /// Build a client from the source and scope sections.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the HTTP client cannot be built.
    pub fn new(source: &SourceConfig, scope: &ScopeConfig) -> Result<Self, SourceError> {
        let http = reqwest::Client::builder()
            .user_agent("tallyport/0.1")
            .timeout(Duration::from_secs(source.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: source.base_url(),
            window: SourceWindow {
                from: source.from_date,
                to: source.to_date,
            },
            configured_company: scope.company.clone().filter(|c| !c.trim().is_empty()),
            resolved_company: OnceCell::new(),
            division: scope.division.clone().filter(|d| !d.trim().is_empty()),
        })
    }

    /// Names of the companies loaded in the source.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the source is unreachable or rejects the request.
    pub async fn companies(&self) -> Result<Vec<String>, SourceError> {
        let body = self
            .post(build_request(EntityType::Company, None, self.date_window(None)))
            .await?;
        TallyRecords::new(clean_response(&body), EntityType::Company, None)
            .map(|record| {
                record.map(|r| r.get("name").map(tp_core::Value::render).unwrap_or_default())
            })
            .filter(|name| !matches!(name, Ok(n) if n.is_empty()))
            .collect()
    }

    /// Company context for scoped queries: the configured company, else the
    /// first company the source reports.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Rejected`] when no company is loaded.
    pub async fn context_company(&self) -> Result<&str, SourceError> {
        if let Some(company) = &self.configured_company {
            return Ok(company);
        }
        let company = self
            .resolved_company
            .get_or_try_init(|| async {
                let companies = self.companies().await?;
                let first = companies
                    .into_iter()
                    .next()
                    .ok_or_else(|| SourceError::Rejected("no company is loaded in the source".into()))?;
                tracing::info!(company = %first, "using first company reported by the source");
                Ok::<_, SourceError>(first)
            })
            .await?;
        Ok(company)
    }

    fn date_window(&self, since: Option<Watermark>) -> DateWindow {
        DateWindow {
            from: since.map(|wm| wm.date()).or(self.window.from),
            to: self.window.to.unwrap_or_else(|| Utc::now().date_naive()),
        }
    }

    async fn post(&self, body: String) -> Result<String, SourceError> {
        tracing::debug!(url = %self.base_url, bytes = body.len(), "sending source request");
        let resp = self
            .http
            .post(&self.base_url)
            .header(reqwest::header::CONTENT_TYPE, "application/xml")
            .body(body)
            .send()
            .await
            .map_err(|e| SourceError::Unavailable(transport_message(&e)))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| SourceError::Unavailable(transport_message(&e)))?;
        if status.is_server_error() {
            return Err(SourceError::Unavailable(format!("{status}: {}", snippet(&text))));
        }
        if !status.is_success() {
            return Err(SourceError::Rejected(format!("{status}: {}", snippet(&text))));
        }
        tracing::debug!(bytes = text.len(), "source responded");
        Ok(text)
    }
}

#[async_trait]
impl Source for TallyClient {
    async fn fetch(
        &self,
        entity: EntityType,
        since: Option<Watermark>,
    ) -> Result<RecordStream, SourceError> {
        let company = if entity.is_company_scoped() {
            Some(self.context_company().await?.to_string())
        } else {
            None
        };
        let since = since.filter(|_| entity.supports_change_filter());
        let request = build_request(entity, company.as_deref(), self.date_window(since));
        let body = self.post(request).await?;
        tracing::debug!(%entity, incremental = since.is_some(), "parsing source response");
        let records = TallyRecords::new(clean_response(&body), entity, company);
        match (entity, self.division.clone()) {
            (EntityType::Division, Some(division)) => Ok(Box::new(
                records.filter(move |record| in_division(record, &division)),
            )),
            _ => Ok(Box::new(records)),
        }
    }

    async fn ping(&self) -> Result<(), SourceError> {
        self.post(build_request(EntityType::Company, None, self.date_window(None)))
            .await
            .map(|_| ())
    }
}

/// The configured division and the cost centres directly under it. Errors
/// pass through so the stream still ends with them.
fn in_division(record: &Result<Record, SourceError>, division: &str) -> bool {
    record.as_ref().map_or(true, |r| {
        ["name", "parent"]
            .iter()
            .any(|field| r.get(field).is_some_and(|v| v.render() == division))
    })
}

fn transport_message(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("request timed out: {err}")
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else {
        err.to_string()
    }
}

fn snippet(text: &str) -> &str {
    let end = text
        .char_indices()
        .nth(200)
        .map_or(text.len(), |(i, _)| i);
    &text[..end]
}
