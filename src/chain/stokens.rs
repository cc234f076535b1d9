//! sTokens event decoding and contract reads.

use alloy::eips::BlockNumberOrTag;
use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, TxHash, U256};
use alloy::rpc::types::{Filter, Log, TransactionRequest};
use alloy::sol_types::{SolCall, SolEvent};

use crate::chain::client::ChainClient;
use crate::chain::contracts::STokens;
use crate::chain::metadata::{decode_token_uri, TokenMetadata};
use crate::chain::types::{ChainError, ChainResult};

/// A decoded `Minted` event with its position on chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintedEvent {
    pub token_id: U256,
    pub owner: Address,
    pub property: Address,
    pub amount: U256,
    pub block_number: u64,
    pub log_index: u64,
    pub transaction_hash: Option<TxHash>,
}

/// Where to start scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FromBlock {
    Number(u64),
    Latest,
}

/// Decode `Minted` logs, ordered by block then log index.
///
/// Fails as a whole when any log is not a `Minted` event.
pub fn decode_minted(logs: &[Log]) -> ChainResult<Vec<MintedEvent>> {
    let mut events = logs
        .iter()
        .map(|log| {
            let minted = log
                .log_decode::<STokens::Minted>()
                .map_err(|e| {
                    tracing::debug!(error = %e, "Undecodable Minted log");
                    ChainError::Decode("Failed to parse some events".to_string())
                })?
                .inner
                .data;
            Ok(MintedEvent {
                token_id: minted.tokenId,
                owner: minted.owner,
                property: minted.property,
                amount: minted.amount,
                block_number: log.block_number.unwrap_or_default(),
                log_index: log.log_index.unwrap_or_default(),
                transaction_hash: log.transaction_hash,
            })
        })
        .collect::<ChainResult<Vec<_>>>()?;

    events.sort_by_key(|e| (e.block_number, e.log_index));
    Ok(events)
}

/// Recipient of the highest-index `Transfer` emitted by `contract` among
/// `logs`.
pub fn last_transfer_recipient(logs: &[Log], contract: Address) -> Option<Address> {
    logs.iter()
        .filter(|log| log.address() == contract)
        .filter(|log| log.topic0() == Some(&STokens::Transfer::SIGNATURE_HASH))
        .max_by_key(|log| log.log_index.unwrap_or_default())
        .and_then(|log| log.log_decode::<STokens::Transfer>().ok())
        .map(|decoded| decoded.inner.data.to)
}

impl ChainClient {
    /// Raw `Minted` logs of `contract` from `from` to the chain head.
    pub async fn minted_logs(&self, contract: Address, from: FromBlock) -> ChainResult<Vec<Log>> {
        let filter = Filter::new()
            .address(contract)
            .event_signature(STokens::Minted::SIGNATURE_HASH);
        let filter = match from {
            FromBlock::Number(n) => filter.from_block(n),
            FromBlock::Latest => filter.from_block(BlockNumberOrTag::Latest),
        };

        let logs = self.get_logs(&filter).await?;
        tracing::debug!(contract = %contract, fetched = logs.len(), "Minted logs");
        Ok(logs)
    }

    /// All decoded `Minted` events of `contract` from `from` to the chain head.
    pub async fn minted_events(
        &self,
        contract: Address,
        from: FromBlock,
    ) -> ChainResult<Vec<MintedEvent>> {
        decode_minted(&self.minted_logs(contract, from).await?)
    }

    /// Owner according to the last `Transfer` in the minting transaction.
    pub async fn minted_to(&self, contract: Address, tx_hash: TxHash) -> ChainResult<Option<Address>> {
        let receipt = self.get_transaction_receipt(tx_hash).await?;
        Ok(receipt.and_then(|r| last_transfer_recipient(r.inner.logs(), contract)))
    }

    pub async fn token_uri(&self, contract: Address, token_id: U256) -> ChainResult<String> {
        let call = STokens::tokenURICall { tokenId: token_id };
        let output = self.call(read_call(contract, call.abi_encode())).await?;
        STokens::tokenURICall::abi_decode_returns(&output)
            .map_err(|e| ChainError::Decode(format!("tokenURI: {}", e)))
    }

    /// Decoded metadata of `token_id`.
    pub async fn token_metadata(&self, contract: Address, token_id: U256) -> ChainResult<TokenMetadata> {
        Ok(decode_token_uri(&self.token_uri(contract, token_id).await?))
    }

    pub async fn owner_of(&self, contract: Address, token_id: U256) -> ChainResult<Address> {
        let call = STokens::ownerOfCall { tokenId: token_id };
        let output = self.call(read_call(contract, call.abi_encode())).await?;
        STokens::ownerOfCall::abi_decode_returns(&output)
            .map_err(|e| ChainError::Decode(format!("ownerOf: {}", e)))
    }
}

fn read_call(to: Address, input: Vec<u8>) -> TransactionRequest {
    TransactionRequest::default().with_to(to).with_input(input)
}
