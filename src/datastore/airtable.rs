//! Airtable REST client.
//!
//! # Responsibilities
//! - Build `https://api.airtable.com/v0/{base}/{table}` URLs
//! - Translate [`SelectQuery`] into the list-records query string
//! - Chunk writes to the per-request record limit
//! - Surface API error bodies as [`DatastoreError::Api`]

use std::time::Duration;

use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use crate::config::DatastoreConfig;
use crate::datastore::types::{DatastoreError, Fields, Page, Record, SelectQuery, StoreResult};
use crate::datastore::{TabularStore, MAX_RECORDS_PER_WRITE};

/// Airtable client for one base.
#[derive(Clone)]
pub struct AirtableClient {
    http: reqwest::Client,
    api_url: String,
    base: Option<String>,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct RecordsBody {
    #[serde(default)]
    records: Vec<Record>,
}

impl AirtableClient {
    /// Create a client. Missing credentials are reported per call, so the
    /// chain-only endpoints keep working without a datastore.
    pub fn new(config: &DatastoreConfig) -> StoreResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        if config.base.is_none() || config.api_key.is_none() {
            tracing::warn!("Datastore credentials missing; datastore endpoints will fail");
        }

        Ok(Self {
            http,
            api_url: config.api_url.clone(),
            base: config.base.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn table_url(&self, table: &str) -> StoreResult<url::Url> {
        let base = self
            .base
            .as_deref()
            .ok_or(DatastoreError::NotConfigured("AIRTABLE_BASE"))?;
        let mut url = url::Url::parse(&self.api_url)
            .map_err(|e| DatastoreError::Decode(format!("invalid api_url: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| DatastoreError::Decode("api_url cannot be a base".to_string()))?
            .pop_if_empty()
            .push(base)
            .push(table);
        Ok(url)
    }

    fn api_key(&self) -> StoreResult<&str> {
        self.api_key
            .as_deref()
            .ok_or(DatastoreError::NotConfigured("AIRTABLE_API_KEY"))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> StoreResult<T> {
        let response = request.bearer_auth(self.api_key()?).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DatastoreError::Api {
                status: status.as_u16(),
                message: api_error_message(&body),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| DatastoreError::Decode(e.to_string()))
    }
}

/// Query-string pairs for a list-records call.
fn select_params(query: &SelectQuery) -> Vec<(String, String)> {
    let mut params = Vec::new();
    for field in &query.fields {
        params.push(("fields[]".to_string(), field.clone()));
    }
    if let Some(formula) = &query.filter_by_formula {
        params.push(("filterByFormula".to_string(), formula.clone()));
    }
    for (i, sort) in query.sort.iter().enumerate() {
        params.push((format!("sort[{}][field]", i), sort.field.clone()));
        params.push((format!("sort[{}][direction]", i), sort.direction.as_str().to_string()));
    }
    if let Some(max) = query.max_records {
        params.push(("maxRecords".to_string(), max.to_string()));
    }
    if let Some(size) = query.page_size {
        params.push(("pageSize".to_string(), size.to_string()));
    }
    if let Some(offset) = &query.offset {
        params.push(("offset".to_string(), offset.clone()));
    }
    params
}

/// Pull the human message out of an error body, whichever shape it has.
fn api_error_message(body: &str) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    let error = parsed.as_ref().and_then(|v| v.get("error"));
    match error {
        Some(serde_json::Value::String(kind)) => kind.clone(),
        Some(e) => e
            .get("message")
            .or_else(|| e.get("type"))
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| e.to_string()),
        None if body.is_empty() => "empty response".to_string(),
        None => body.to_string(),
    }
}

impl TabularStore for AirtableClient {
    async fn select(&self, table: &str, query: &SelectQuery) -> StoreResult<Page> {
        let url = self.table_url(table)?;
        tracing::debug!(table = %table, formula = ?query.filter_by_formula, "Selecting records");
        self.send(self.http.get(url).query(&select_params(query)))
            .await
    }

    async fn create(&self, table: &str, rows: Vec<Fields>) -> StoreResult<Vec<Record>> {
        let url = self.table_url(table)?;
        let mut created = Vec::with_capacity(rows.len());

        for chunk in rows.chunks(MAX_RECORDS_PER_WRITE) {
            let records: Vec<_> = chunk.iter().map(|fields| json!({ "fields": fields })).collect();
            let body: RecordsBody = self
                .send(self.http.post(url.clone()).json(&json!({ "records": records })))
                .await?;
            created.extend(body.records);
        }

        tracing::debug!(table = %table, count = created.len(), "Created records");
        Ok(created)
    }

    async fn update(&self, table: &str, records: Vec<Record>) -> StoreResult<Vec<Record>> {
        let url = self.table_url(table)?;
        let mut updated = Vec::with_capacity(records.len());

        for chunk in records.chunks(MAX_RECORDS_PER_WRITE) {
            let records: Vec<_> = chunk
                .iter()
                .map(|r| json!({ "id": r.id, "fields": r.fields }))
                .collect();
            let body: RecordsBody = self
                .send(self.http.patch(url.clone()).json(&json!({ "records": records })))
                .await?;
            updated.extend(body.records);
        }

        tracing::debug!(table = %table, count = updated.len(), "Updated records");
        Ok(updated)
    }
}

impl std::fmt::Debug for AirtableClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AirtableClient")
            .field("api_url", &self.api_url)
            .field("base", &self.base)
            .finish()
    }
}
