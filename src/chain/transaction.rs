//! Transaction building, signing and broadcast.
//!
//! # Responsibilities
//! - Connect a signing provider to a caller-chosen RPC endpoint
//! - Estimate fees and gas before sending
//! - Broadcast and hand back the transaction hash without waiting for
//!   confirmation

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, TxHash};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use tokio::time::timeout;

use crate::chain::client::{parse_rpc_url, SharedProvider};
use crate::chain::fees;
use crate::chain::types::{ChainError, ChainResult};
use crate::chain::wallet::Wallet;

/// Signs and sends transactions through one RPC endpoint.
pub struct TxSender {
    provider: SharedProvider,
    from: Address,
    timeout_duration: Duration,
}

impl TxSender {
    /// Connect `wallet` to `rpc_url`. Nonce and chain id are filled by the
    /// provider when missing from the request.
    pub fn connect(rpc_url: &str, wallet: &Wallet, timeout_secs: u64) -> ChainResult<Self> {
        let url = parse_rpc_url(rpc_url)?;
        let provider = ProviderBuilder::new()
            .wallet(wallet.network_wallet())
            .connect_http(url);

        Ok(Self {
            provider: Arc::new(provider),
            from: wallet.address(),
            timeout_duration: Duration::from_secs(timeout_secs),
        })
    }

    async fn timed<T, E, F>(&self, op: &'static str, request: F) -> ChainResult<T>
    where
        F: IntoFuture<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        match timeout(self.timeout_duration, request).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => {
                tracing::warn!(op, error = %e, "RPC error");
                Err(ChainError::Rpc(e.to_string()))
            }
            Err(_) => {
                tracing::warn!(op, "RPC timeout");
                Err(ChainError::Timeout(self.timeout_duration.as_secs()))
            }
        }
    }

    /// Build a contract call with fee data and a gas limit.
    ///
    /// Fails when gas estimation fails, which is how a call that would revert
    /// is reported before anything is broadcast.
    pub async fn prepare(
        &self,
        to: Address,
        input: Bytes,
        chain_id: u64,
    ) -> ChainResult<TransactionRequest> {
        let tx = TransactionRequest::default()
            .with_from(self.from)
            .with_to(to)
            .with_input(input)
            .with_chain_id(chain_id);

        let fee_data = self
            .timed("fee_data", fees::fee_data(self.provider.as_ref()))
            .await?;
        let gas_limit = self
            .timed("estimate_gas", self.provider.estimate_gas(tx.clone()))
            .await?;

        tracing::debug!(to = %to, gas_limit, fees = ?fee_data, "Transaction prepared");
        Ok(fee_data.apply(tx).with_gas_limit(gas_limit))
    }

    /// Sign and broadcast `tx`.
    pub async fn send(&self, tx: TransactionRequest) -> ChainResult<TxHash> {
        let pending = self
            .timed("send_transaction", self.provider.send_transaction(tx))
            .await?;
        let hash = *pending.tx_hash();
        tracing::info!(tx_hash = %hash, from = %self.from, "Transaction sent");
        Ok(hash)
    }

    pub fn from(&self) -> Address {
        self.from
    }
}
