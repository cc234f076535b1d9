//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build shared application state from the validated config
//! - Create the axum Router with every endpoint
//! - Wire up middleware (request ID, tracing, body limit, timeout, auth)
//! - Serve until shutdown is triggered

use std::sync::Arc;
use std::time::Duration;

use axum::middleware::from_fn_with_state;
use axum::response::Response;
use axum::routing::{get, post};
use axum::http::StatusCode;
use axum::Router;
use serde_json::json;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::chain::{ChainClient, ChainError, Wallet};
use crate::config::AppConfig;
use crate::datastore::{AirtableClient, DatastoreError, TabularStore};
use crate::endpoints::{access_control, exists, nfts, relay, stokens, tickets};
use crate::http::auth::require_bearer;
use crate::http::request::{propagate_request_id_layer, request_span, set_request_id_layer};
use crate::http::response::{self, Cors};
use crate::lifecycle::Shutdown;
use crate::queue::TaskQueue;
use crate::replay::{ReplayBackend, ReplayError};

/// Errors building the application state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error(transparent)]
    Datastore(#[from] DatastoreError),
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error(transparent)]
    Replay(#[from] ReplayError),
}

/// Application state injected into handlers.
pub struct AppState<S> {
    pub config: Arc<AppConfig>,
    pub store: Arc<S>,
    pub chain: ChainClient,
    /// Limits concurrent outbound RPC calls across requests.
    pub queue: TaskQueue,
    pub replay: ReplayBackend,
    /// Relayer wallet, when key material is configured.
    pub wallet: Option<Wallet>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            store: self.store.clone(),
            chain: self.chain.clone(),
            queue: self.queue.clone(),
            replay: self.replay.clone(),
            wallet: self.wallet.clone(),
        }
    }
}

impl<S: TabularStore> AppState<S> {
    /// State over an explicit datastore.
    pub fn with_store(config: AppConfig, store: S) -> Result<Self, StateError> {
        let chain = ChainClient::new(&config.chain)?;
        let queue = TaskQueue::new(config.chain.rpc_max_concurrency);
        let replay = ReplayBackend::from_url(config.relay.redis_url.as_deref())?;
        let wallet = Wallet::from_secrets(&config.secrets)?;

        if wallet.is_none() {
            tracing::warn!("No MNEMONIC or PRIVATE_KEY set; relay requests will fail");
        }

        Ok(Self {
            config: Arc::new(config),
            store: Arc::new(store),
            chain,
            queue,
            replay,
            wallet,
        })
    }
}

impl AppState<AirtableClient> {
    /// State over the Airtable client described by the config.
    pub fn from_config(config: AppConfig) -> Result<Self, StateError> {
        let store = AirtableClient::new(&config.datastore)?;
        Self::with_store(config, store)
    }
}

/// Build the axum router with all middleware layers.
#[allow(deprecated)]
pub fn build_router<S: TabularStore>(state: AppState<S>) -> Router {
    let request_timeout = Duration::from_secs(state.config.timeouts.request_secs);
    let max_body_size = state.config.security.max_body_size;

    let relay_routes = Router::new()
        .route(
            "/api/send-transactions/SwapTokensAndStakeDev",
            post(relay::handler::<S>),
        )
        .route_layer(from_fn_with_state(state.clone(), require_bearer::<S>));

    Router::new()
        .route("/health", get(health))
        .route("/api/airtable/exists/{table}", get(exists::handler::<S>))
        .route(
            "/api/access-control/airtable/{table}",
            get(access_control::by_field_name::<S>),
        )
        .route(
            "/api/access-control/airtable/{table}/{field}",
            get(access_control::by_field_id::<S>),
        )
        .route(
            "/api/webhooks/tickets/{key}/dest/airtable/{table}",
            post(tickets::handler::<S>),
        )
        .route(
            "/api/webhooks/nfts/{propertyAddress}/airtable/{table}",
            get(nfts::handler::<S>),
        )
        .route(
            "/api/webhooks/s-tokens/{propertyAddress}/airtable/{table}",
            get(stokens::webhook_handler::<S>),
        )
        .route(
            "/api/crons/s-tokens/dest/airtable",
            get(stokens::cron_handler::<S>),
        )
        .merge(relay_routes)
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(RequestBodyLimitLayer::new(max_body_size))
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .layer(propagate_request_id_layer())
        .layer(set_request_id_layer())
}

async fn health() -> Response {
    response::json(
        StatusCode::OK,
        &json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }),
        Cors::Omit,
    )
}

/// HTTP server for the sync service.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new<S: TabularStore>(state: AppState<S>) -> Self {
        Self {
            router: build_router(state),
        }
    }

    /// Serve on `listener` until `shutdown` is triggered, then drain
    /// in-flight requests.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown.wait())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }
}
