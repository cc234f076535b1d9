//! Chain RPC client with timeout and failover.
//!
//! # Responsibilities
//! - Connect to the primary JSON-RPC endpoint plus fallbacks
//! - Query chain state (block number, block time, logs, receipts)
//! - Run read-only contract calls and gas estimation
//! - Handle timeouts and network errors by moving to the next provider

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use alloy::eips::BlockNumberOrTag;
use alloy::primitives::{Bytes, TxHash};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::{Filter, Log, TransactionReceipt, TransactionRequest};
use tokio::time::timeout;

use crate::chain::fees::{self, FeeData};
use crate::chain::types::{iso_timestamp, ChainError, ChainResult};
use crate::config::ChainConfig;

pub(crate) type SharedProvider = Arc<dyn Provider + Send + Sync>;

/// Chain RPC client wrapper with failover support.
#[derive(Clone)]
pub struct ChainClient {
    /// Primary first, then failovers in configured order.
    providers: Vec<SharedProvider>,
    rpc_url: String,
    timeout_duration: Duration,
}

impl ChainClient {
    /// Create a client for the configured endpoints.
    ///
    /// No request is made here; an unreachable node surfaces on first use.
    pub fn new(config: &ChainConfig) -> ChainResult<Self> {
        let mut providers = vec![connect(&config.rpc_url)?];

        for url in &config.failover_urls {
            match connect(url) {
                Ok(provider) => providers.push(provider),
                Err(e) => tracing::warn!(url = %url, error = %e, "Ignoring invalid failover RPC URL"),
            }
        }

        tracing::info!(
            rpc_url = %config.rpc_url,
            failovers = providers.len() - 1,
            "Chain client initialized"
        );

        Ok(Self {
            providers,
            rpc_url: config.rpc_url.clone(),
            timeout_duration: Duration::from_secs(config.rpc_timeout_secs),
        })
    }

    /// Try `request` against each provider in turn.
    async fn with_failover<T, E, F, Fut>(&self, op: &'static str, request: F) -> ChainResult<T>
    where
        F: Fn(SharedProvider) -> Fut,
        Fut: IntoFuture<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut last_error = None;
        for (i, provider) in self.providers.iter().enumerate() {
            match timeout(self.timeout_duration, request(provider.clone())).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) => {
                    tracing::warn!(provider_idx = i, op, error = %e, "RPC error, trying next provider");
                    last_error = Some(ChainError::Rpc(e.to_string()));
                }
                Err(_) => {
                    tracing::warn!(provider_idx = i, op, "RPC timeout, trying next provider");
                    last_error = Some(ChainError::Timeout(self.timeout_duration.as_secs()));
                }
            }
        }
        Err(last_error.unwrap_or_else(|| ChainError::Rpc(format!("No provider for {}", op))))
    }

    /// Get the latest block number.
    pub async fn get_block_number(&self) -> ChainResult<u64> {
        self.with_failover("get_block_number", |p| async move { p.get_block_number().await })
            .await
    }

    /// Block timestamp as an ISO-8601 UTC string.
    pub async fn get_block_timestamp(&self, number: u64) -> ChainResult<String> {
        let block = self
            .with_failover("get_block", |p| async move {
                p.get_block_by_number(BlockNumberOrTag::Number(number)).await
            })
            .await?
            .ok_or_else(|| ChainError::NotFound(format!("block {}", number)))?;

        iso_timestamp(block.header.timestamp)
            .ok_or_else(|| ChainError::Decode(format!("block {} timestamp out of range", number)))
    }

    /// Fetch logs matching `filter`.
    pub async fn get_logs(&self, filter: &Filter) -> ChainResult<Vec<Log>> {
        self.with_failover("get_logs", |p| {
            let filter = filter.clone();
            async move { p.get_logs(&filter).await }
        })
        .await
    }

    /// Get a transaction receipt by hash.
    pub async fn get_transaction_receipt(
        &self,
        tx_hash: TxHash,
    ) -> ChainResult<Option<TransactionReceipt>> {
        self.with_failover("get_transaction_receipt", |p| async move {
            p.get_transaction_receipt(tx_hash).await
        })
        .await
    }

    /// Execute a read-only call and return the raw output.
    pub async fn call(&self, tx: TransactionRequest) -> ChainResult<Bytes> {
        self.with_failover("call", |p| {
            let tx = tx.clone();
            async move { p.call(tx).await }
        })
        .await
    }

    pub async fn estimate_gas(&self, tx: TransactionRequest) -> ChainResult<u64> {
        self.with_failover("estimate_gas", |p| {
            let tx = tx.clone();
            async move { p.estimate_gas(tx).await }
        })
        .await
    }

    /// Current fee data from the first provider that answers.
    pub async fn get_fee_data(&self) -> ChainResult<FeeData> {
        self.with_failover("get_fee_data", |p| async move { fees::fee_data(p.as_ref()).await })
            .await
    }

    /// Check if the node is reachable.
    pub async fn is_healthy(&self) -> bool {
        self.get_block_number().await.is_ok()
    }
}

pub(crate) fn parse_rpc_url(url: &str) -> ChainResult<url::Url> {
    url.parse().map_err(|e: url::ParseError| ChainError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

/// Build an HTTP provider for `url`.
fn connect(url: &str) -> ChainResult<SharedProvider> {
    let parsed = parse_rpc_url(url)?;
    Ok(Arc::new(ProviderBuilder::new().connect_http(parsed)) as SharedProvider)
}

impl std::fmt::Debug for ChainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainClient")
            .field("rpc_url", &self.rpc_url)
            .field("providers", &self.providers.len())
            .field("timeout_secs", &self.timeout_duration.as_secs())
            .finish()
    }
}
