//! Shared utilities for integration tests.
//!
//! - [`FakeStore`]: in-memory tabular datastore with Airtable-like paging
//! - [`start_mock_rpc`]: programmable JSON-RPC node
//! - [`test_config`] / [`app`] / [`send`]: router driven in-process

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower::ServiceExt;

use onchain_sync::datastore::{
    DatastoreError, Fields, Page, Record, SelectQuery, SortDirection, StoreResult, TabularStore,
};
use onchain_sync::http::build_router;
use onchain_sync::{AppConfig, AppState};

pub const STOKENS: &str = "0x50489Ff5f879A44C87bBA85287729D663b18CeD5";
pub const AGENT: &str = "0x0000000000000000000000000000000000000def";
pub const API_KEY: &str = "test-api-key";
pub const TICKETS_KEY: &str = "tickets-key";
/// Port 1 is never listening, so RPC calls fail fast.
pub const DEAD_RPC: &str = "http://127.0.0.1:1";
pub const ANVIL_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

#[derive(Default)]
struct Inner {
    tables: Mutex<HashMap<String, Vec<Record>>>,
    /// Field id → display name.
    field_ids: Mutex<HashMap<String, String>>,
    selects: Mutex<Vec<(String, SelectQuery)>>,
    failure: Mutex<Option<String>>,
    next_id: AtomicUsize,
}

/// In-memory datastore.
///
/// Formulas are recorded but not evaluated: every row is returned, so
/// callers must do their own exact matching, as they do against the real
/// service when a formula is loose.
#[derive(Clone)]
pub struct FakeStore {
    inner: Arc<Inner>,
    page_size: usize,
}

impl FakeStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::default(),
            page_size: 100,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_field_id(self, id: &str, name: &str) -> Self {
        self.inner
            .field_ids
            .lock()
            .unwrap()
            .insert(id.to_string(), name.to_string());
        self
    }

    pub fn seed(&self, table: &str, rows: Vec<Value>) {
        for row in rows {
            let fields = row.as_object().cloned().unwrap_or_default();
            self.insert(table, fields);
        }
    }

    /// Make every following call fail with an API error.
    pub fn fail_with(&self, message: &str) {
        *self.inner.failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn rows(&self, table: &str) -> Vec<Record> {
        self.inner
            .tables
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    pub fn selects(&self) -> Vec<(String, SelectQuery)> {
        self.inner.selects.lock().unwrap().clone()
    }

    fn insert(&self, table: &str, fields: Fields) -> Record {
        let n = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let record = Record {
            id: format!("rec{:04}", n),
            fields,
            created_time: Some("2024-01-01T00:00:00.000Z".to_string()),
        };
        self.inner
            .tables
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .push(record.clone());
        record
    }

    fn check_failure(&self) -> StoreResult<()> {
        match self.inner.failure.lock().unwrap().clone() {
            Some(message) => Err(DatastoreError::Api {
                status: 422,
                message,
            }),
            None => Ok(()),
        }
    }

    fn project(&self, record: &Record, wanted: &[String]) -> Record {
        if wanted.is_empty() {
            return record.clone();
        }
        let ids = self.inner.field_ids.lock().unwrap();
        let fields = wanted
            .iter()
            .map(|f| ids.get(f).cloned().unwrap_or_else(|| f.clone()))
            .filter_map(|name| record.fields.get(&name).map(|v| (name, v.clone())))
            .collect();
        Record {
            id: record.id.clone(),
            fields,
            created_time: record.created_time.clone(),
        }
    }
}

fn sort_key(record: &Record, field: &str) -> f64 {
    match record.fields.get(field) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::MIN),
        Some(Value::String(s)) => s.parse().unwrap_or(f64::MIN),
        _ => f64::MIN,
    }
}

impl TabularStore for FakeStore {
    async fn select(&self, table: &str, query: &SelectQuery) -> StoreResult<Page> {
        self.check_failure()?;
        self.inner
            .selects
            .lock()
            .unwrap()
            .push((table.to_string(), query.clone()));

        let mut rows = self.rows(table);
        if let Some(sort) = query.sort.first() {
            rows.sort_by(|a, b| {
                let ord = sort_key(a, &sort.field).total_cmp(&sort_key(b, &sort.field));
                match sort.direction {
                    SortDirection::Asc => ord,
                    SortDirection::Desc => ord.reverse(),
                }
            });
        }
        if let Some(max) = query.max_records {
            rows.truncate(max as usize);
        }

        let start: usize = query
            .offset
            .as_deref()
            .and_then(|o| o.parse().ok())
            .unwrap_or(0);
        let end = (start + self.page_size).min(rows.len());
        let records = rows[start.min(end)..end]
            .iter()
            .map(|r| self.project(r, &query.fields))
            .collect();
        let offset = (end < rows.len()).then(|| end.to_string());

        Ok(Page { records, offset })
    }

    async fn create(&self, table: &str, rows: Vec<Fields>) -> StoreResult<Vec<Record>> {
        self.check_failure()?;
        Ok(rows.into_iter().map(|f| self.insert(table, f)).collect())
    }

    async fn update(&self, table: &str, records: Vec<Record>) -> StoreResult<Vec<Record>> {
        self.check_failure()?;
        let mut tables = self.inner.tables.lock().unwrap();
        let rows = tables.entry(table.to_string()).or_default();
        let mut updated = Vec::new();
        for patch in records {
            match rows.iter_mut().find(|r| r.id == patch.id) {
                Some(row) => {
                    row.fields.extend(patch.fields);
                    updated.push(row.clone());
                }
                None => {
                    return Err(DatastoreError::Api {
                        status: 404,
                        message: format!("Record {} not found", patch.id),
                    })
                }
            }
        }
        Ok(updated)
    }
}

/// Config pointing every collaborator at test doubles.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.auth.api_key = Some(API_KEY.to_string());
    config.chain.rpc_url = DEAD_RPC.to_string();
    config.chain.rpc_timeout_secs = 5;
    config.chain.stokens_address = Some(STOKENS.to_string());
    config.tickets.key = Some(TICKETS_KEY.to_string());
    config.tickets.fields = [
        ("status", "Status"),
        ("id", "Token"),
        ("account", "Wallet"),
        ("benefit_id", "Benefit Id"),
        ("benefit_description", "Benefit"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    config
        .relay
        .swap_contracts
        .insert("137".to_string(), AGENT.to_string());
    config.relay.rpc_timeout_secs = 5;
    config
}

pub fn app(config: AppConfig, store: FakeStore) -> Router {
    let state = AppState::with_store(config, store).expect("state");
    build_router(state)
}

pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl Reply {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).expect("json body")
    }
}

pub async fn send(router: Router, request: Request<Body>) -> Reply {
    let response = router.oneshot(request).await.expect("infallible");
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    Reply {
        status,
        headers,
        body: String::from_utf8_lossy(&bytes).into_owned(),
    }
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Percent-encode a query value.
pub fn enc(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Start a JSON-RPC node answering each call with `respond(method, params)`.
///
/// Returns the node URL.
pub async fn start_mock_rpc<F>(respond: F) -> String
where
    F: Fn(&str, &Value) -> Value + Send + Sync + 'static,
{
    let respond = Arc::new(respond);
    let app = Router::new().route(
        "/",
        post(move |Json(request): Json<Value>| {
            let respond = respond.clone();
            async move {
                let method = request["method"].as_str().unwrap_or_default();
                let result = respond(method, &request["params"]);
                Json(json!({ "jsonrpc": "2.0", "id": request["id"].clone(), "result": result }))
            }
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{}", addr)
}
