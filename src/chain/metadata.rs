//! Token metadata carried in `tokenURI` data URIs.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use serde_json::Value;

use crate::datastore::types::cell_text;

const DATA_URI_HEADER: &str = "data:application/json;base64";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TokenMetadata {
    pub name: String,
    pub description: String,
    pub image: String,
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Attribute {
    pub trait_type: String,
    pub value: Value,
}

impl TokenMetadata {
    /// Value of the first attribute with this trait type.
    pub fn attribute(&self, trait_type: &str) -> Option<&Value> {
        self.attributes
            .iter()
            .find(|a| a.trait_type == trait_type)
            .map(|a| &a.value)
    }

    /// Attribute value rendered as text.
    pub fn attribute_text(&self, trait_type: &str) -> Option<String> {
        self.attribute(trait_type).and_then(cell_text)
    }
}

/// Decode a `data:application/json;base64,...` token URI.
///
/// Whitespace around the header tokens is ignored. Anything that does not
/// decode to a metadata object yields empty metadata.
pub fn decode_token_uri(uri: &str) -> TokenMetadata {
    match try_decode(uri) {
        Ok(metadata) => metadata,
        Err(reason) => {
            tracing::warn!(reason = %reason, "Unreadable token metadata");
            TokenMetadata::default()
        }
    }
}

fn try_decode(uri: &str) -> Result<TokenMetadata, String> {
    let payload = match uri.split_once(',') {
        Some((header, payload)) if strip_whitespace(header) == DATA_URI_HEADER => payload,
        _ => uri,
    };

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| format!("base64: {}", e))?;
    serde_json::from_slice(&bytes).map_err(|e| format!("json: {}", e))
}

fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn encode(value: &Value) -> String {
        STANDARD.encode(value.to_string())
    }

    fn sample() -> Value {
        json!({
            "name": "Ticket #1",
            "description": "",
            "image": "ipfs://x",
            "attributes": [
                { "trait_type": "Destination", "value": "0xAbC" },
                { "trait_type": "Payload", "value": "0x01" },
                { "trait_type": "Locked Amount", "value": 12.5 }
            ]
        })
    }

    #[test]
    fn test_decode_data_uri() {
        let uri = format!("data:application/json;base64,{}", encode(&sample()));
        let metadata = decode_token_uri(&uri);

        assert_eq!(metadata.name, "Ticket #1");
        assert_eq!(metadata.attribute_text("Destination").as_deref(), Some("0xAbC"));
        assert_eq!(metadata.attribute_text("Locked Amount").as_deref(), Some("12.5"));
        assert_eq!(metadata.attribute("Missing"), None);
    }

    #[test]
    fn test_header_whitespace_tolerated() {
        let uri = format!("data : application / json ; base64 ,  {}  ", encode(&sample()));
        assert_eq!(decode_token_uri(&uri).name, "Ticket #1");
    }

    #[test]
    fn test_malformed_payload_yields_empty() {
        assert_eq!(
            decode_token_uri("data:application/json;base64,!!!"),
            TokenMetadata::default()
        );
        let not_json = format!("data:application/json;base64,{}", STANDARD.encode("nope"));
        assert_eq!(decode_token_uri(&not_json), TokenMetadata::default());
    }

    #[test]
    fn test_partial_metadata() {
        let uri = format!("data:application/json;base64,{}", encode(&json!({ "name": "x" })));
        let metadata = decode_token_uri(&uri);
        assert_eq!(metadata.name, "x");
        assert!(metadata.attributes.is_empty());
    }
}
