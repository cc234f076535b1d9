//! `POST /api/send-transactions/SwapTokensAndStakeDev`
//!
//! Signs and broadcasts `mintFor` on the swap-and-stake agent of the
//! requested chain with the relayer wallet. Bearer auth is enforced by the
//! router.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use alloy::primitives::{Address, TxHash, B256, U256};
use alloy::sol_types::SolCall;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use serde::Deserialize;
use serde_json::json;

use crate::chain::contracts::SwapAndStake;
use crate::chain::TxSender;
use crate::datastore::TabularStore;
use crate::endpoints::report_failure;
use crate::error::Failure;
use crate::http::response::{self, failure_message, status_for, Cors};
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::pipeline::when_not_error_all;
use crate::replay::{replay_key, ReplayGuard};

const ENDPOINT: &str = "relay";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RelayRequest {
    pub rpc_url: Option<String>,
    pub chain_id: Option<u64>,
    pub args: Option<MintForArgs>,
}

/// `mintFor` arguments as sent by the caller. Numbers may be decimal or
/// `0x` hex strings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MintForArgs {
    pub to: String,
    pub property: String,
    pub payload: String,
    pub gateway_address: String,
    pub amounts: AmountArgs,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AmountArgs {
    pub token: String,
    pub input: String,
    pub fee: String,
}

/// Why a relay request did not produce a transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayFailure {
    /// Refused before anything was signed.
    Rejected(Failure),
    /// Encoding, estimation or broadcast failed.
    NotSent(Failure),
}

impl RelayFailure {
    pub fn failure(&self) -> &Failure {
        match self {
            RelayFailure::Rejected(f) | RelayFailure::NotSent(f) => f,
        }
    }
}

fn address_arg(name: &str, value: &str) -> Result<Address, Failure> {
    Address::from_str(value.trim())
        .map_err(|e| Failure::validation(format!("invalid {}: {}", name, e)))
}

fn uint_arg(name: &str, value: &str) -> Result<U256, Failure> {
    U256::from_str(value.trim()).map_err(|e| Failure::validation(format!("invalid {}: {}", name, e)))
}

impl MintForArgs {
    /// ABI call for these arguments.
    pub fn to_call(&self) -> Result<SwapAndStake::mintForCall, Failure> {
        let payload = B256::from_str(self.payload.trim())
            .map_err(|e| Failure::validation(format!("invalid payload: {}", e)));

        when_not_error_all(
            (
                address_arg("to", &self.to),
                address_arg("property", &self.property),
                payload,
                address_arg("gatewayAddress", &self.gateway_address),
                address_arg("amounts.token", &self.amounts.token),
                when_not_error_all(
                    (
                        uint_arg("amounts.input", &self.amounts.input),
                        uint_arg("amounts.fee", &self.amounts.fee),
                    ),
                    Ok,
                ),
            ),
            |(to, property, payload, gateway, token, (input, fee))| {
                Ok(SwapAndStake::mintForCall {
                    to,
                    property,
                    payload,
                    gatewayAddress: gateway,
                    amounts: SwapAndStake::Amounts { token, input, fee },
                })
            },
        )
    }
}

/// Agent contract configured for `chain_id`.
pub fn agent_address(contracts: &BTreeMap<String, String>, chain_id: u64) -> Result<Address, Failure> {
    contracts
        .get(&chain_id.to_string())
        .and_then(|a| a.parse::<Address>().ok())
        .ok_or_else(|| Failure::rule(format!("unexpected chainId: {}", chain_id)))
}

/// Validate the request, then sign and send `mintFor` once per interval.
pub async fn relay<S: TabularStore>(state: &AppState<S>, body: &[u8]) -> Result<TxHash, RelayFailure> {
    use RelayFailure::{NotSent, Rejected};

    let request: RelayRequest = serde_json::from_slice(body).map_err(|e| Rejected(e.into()))?;

    let rpc_url = request
        .rpc_url
        .filter(|u| !u.is_empty())
        .ok_or_else(|| Rejected(Failure::validation("missing parameter: rpcUrl")))?;
    let chain_id = request
        .chain_id
        .filter(|id| *id != 0)
        .ok_or_else(|| Rejected(Failure::validation("missing parameter: chainId")))?;
    let args = request
        .args
        .ok_or_else(|| Rejected(Failure::validation("missing parameter: args")))?;

    let agent = agent_address(&state.config.relay.swap_contracts, chain_id).map_err(Rejected)?;
    let wallet = state
        .wallet
        .as_ref()
        .ok_or_else(|| Rejected(Failure::rule("wallet error")))?;

    let calldata = args.to_call().map_err(NotSent)?.abi_encode();

    let key = replay_key(&agent.to_string(), &calldata);
    let store = state
        .replay
        .open()
        .await
        .map_err(|e| NotSent(e.into()))?;
    let guard = ReplayGuard::new(
        store,
        Duration::from_secs(state.config.relay.min_interval_secs),
    );
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    guard.check(&key, now).await.map_err(Rejected)?;

    let sender = TxSender::connect(&rpc_url, wallet, state.config.relay.rpc_timeout_secs)
        .map_err(|e| NotSent(e.into()))?;
    let tx = sender
        .prepare(agent, calldata.into(), chain_id)
        .await
        .map_err(|e| NotSent(e.into()))?;
    let hash = sender.send(tx).await.map_err(|e| NotSent(e.into()))?;

    if let Err(failure) = guard.record(&key, now).await {
        // the transaction is out; a missed record only weakens throttling
        tracing::warn!(key = %key, error = %failure, "Failed to record relay");
    }

    tracing::info!(chain_id, agent = %agent, tx_hash = %hash, "Relay sent");
    Ok(hash)
}

pub async fn handler<S: TabularStore>(State(state): State<AppState<S>>, body: Bytes) -> Response {
    let response = match relay(&state, &body).await {
        Ok(hash) => response::json(
            StatusCode::OK,
            &json!({ "message": "success", "hash": hash }),
            Cors::Omit,
        ),
        Err(RelayFailure::Rejected(failure)) => {
            report_failure(ENDPOINT, &failure);
            failure_message(&failure, Cors::Omit)
        }
        Err(RelayFailure::NotSent(failure)) => {
            report_failure(ENDPOINT, &failure);
            response::json(
                status_for(&failure),
                &json!({
                    "message": "failed to send the transaction",
                    "error": failure.message(),
                }),
                Cors::Omit,
            )
        }
    };

    metrics::record_request(ENDPOINT, response.status().as_u16());
    response
}
