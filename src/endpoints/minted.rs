//! Steps shared by the NFT and sTokens syncs.

use alloy::primitives::Address;
use serde_json::{json, Value};

use crate::chain::{FromBlock, TokenMetadata};
use crate::config::AppConfig;
use crate::datastore::{ops, TabularStore};
use crate::error::Failure;
use crate::pipeline::when_not_error_async;

/// Metadata attribute naming the property a token belongs to.
pub const ATTR_DESTINATION: &str = "Destination";
pub const ATTR_PAYLOAD: &str = "Payload";
pub const ATTR_LOCKED_AMOUNT: &str = "Locked Amount";

/// Configured sTokens contract.
pub fn stokens_address(config: &AppConfig) -> Result<Address, Failure> {
    config
        .chain
        .stokens_address
        .as_deref()
        .and_then(|a| a.parse::<Address>().ok())
        .ok_or_else(|| Failure::validation("Failed to load sTokens"))
}

/// `fromBlock` query value. Absent and empty both mean unset.
pub fn parse_from_block(raw: Option<&str>) -> Result<Option<u64>, Failure> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => v
            .parse::<u64>()
            .map(Some)
            .map_err(|_| Failure::validation(format!("Invalid fromBlock: {}", v))),
    }
}

/// First block to scan.
///
/// An explicit `from_block` wins. Otherwise the scan resumes right after the
/// highest block already stored in `target` (table, block column), falling
/// back to the chain head when the table is empty or unreadable.
pub async fn next_block<S: TabularStore>(
    store: &S,
    target: Result<(&str, &str), Failure>,
    from_block: Option<u64>,
) -> FromBlock {
    if let Some(n) = from_block {
        return FromBlock::Number(n);
    }

    let latest = when_not_error_async(target, |(table, column)| {
        ops::latest_number(store, table, column)
    })
    .await;

    match latest {
        Ok(n) => FromBlock::Number(n.saturating_add(1)),
        Err(failure) => {
            tracing::debug!(reason = %failure, "No stored block, scanning from latest");
            FromBlock::Latest
        }
    }
}

/// Addresses compared as text, ignoring case.
pub fn property_matches(candidate: &str, property: &str) -> bool {
    candidate.eq_ignore_ascii_case(property)
}

/// Attribute value, or an empty string when the token does not carry it.
pub fn attribute_or_empty(metadata: &TokenMetadata, trait_type: &str) -> Value {
    metadata
        .attribute(trait_type)
        .cloned()
        .unwrap_or_else(|| json!(""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;

    #[test]
    fn test_parse_from_block() {
        assert_eq!(parse_from_block(None).unwrap(), None);
        assert_eq!(parse_from_block(Some("")).unwrap(), None);
        assert_eq!(parse_from_block(Some("120")).unwrap(), Some(120));

        let err = parse_from_block(Some("soon")).unwrap_err();
        assert_eq!(err.kind(), FailureKind::Validation);
        assert_eq!(err.message(), "Invalid fromBlock: soon");
    }

    #[test]
    fn test_stokens_address() {
        let mut config = AppConfig::default();
        assert_eq!(
            stokens_address(&config).unwrap_err().message(),
            "Failed to load sTokens"
        );

        config.chain.stokens_address = Some("0x50489Ff5f879A44C87bBA85287729D663b18CeD5".into());
        assert!(stokens_address(&config).is_ok());
    }

    #[test]
    fn test_property_matches() {
        assert!(property_matches("0xABC", "0xabc"));
        assert!(!property_matches("0xabc", "0xabd"));
    }

    #[test]
    fn test_attribute_or_empty() {
        let metadata: TokenMetadata = serde_json::from_value(json!({
            "name": "Pass",
            "attributes": [{ "trait_type": "Payload", "value": "0x01" }]
        }))
        .unwrap();
        assert_eq!(attribute_or_empty(&metadata, ATTR_PAYLOAD), json!("0x01"));
        assert_eq!(attribute_or_empty(&metadata, ATTR_LOCKED_AMOUNT), json!(""));
    }
}
