//! Role to column mapping for minted-token rows.
//!
//! Callers name their table columns per role, either as a query parameter
//! `fields=[["account","Wallet"],["block","Block"],...]` or as a configured
//! role → column map.

use std::collections::{BTreeMap, HashMap};

use alloy::primitives::U256;
use serde_json::{json, Value};

use crate::datastore::Fields;
use crate::error::Failure;
use crate::pipeline::when_defined_all;

pub const ROLE_ACCOUNT: &str = "account";
pub const ROLE_BLOCK: &str = "block";
pub const ROLE_TIME: &str = "time";
pub const ROLE_TOKEN_ID: &str = "t_id";
pub const ROLE_TOKEN_NAME: &str = "t_name";
pub const ROLE_TOKEN_PAYLOAD: &str = "t_payload";
pub const ROLE_TOKEN_LOCKED: &str = "t_lock";

/// Parse the `fields` query value into a role → column map.
///
/// The value must be a JSON array of arrays. Pairs whose role and column are
/// not both strings are ignored; a later pair for the same role wins.
pub fn parse_pairs(raw: &str) -> Result<HashMap<String, String>, Failure> {
    let value: Value = serde_json::from_str(raw)?;
    let pairs = match value {
        Value::Array(items) if items.iter().all(Value::is_array) => items,
        _ => return Err(Failure::validation("Unexpected fields value")),
    };

    Ok(pairs
        .iter()
        .filter_map(|pair| match pair.as_array().map(Vec::as_slice) {
            Some([Value::String(role), Value::String(column), ..]) => {
                Some((role.clone(), column.clone()))
            }
            _ => None,
        })
        .collect())
}

/// Column names for each role of a minted-token row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintColumns {
    pub account: String,
    pub block: String,
    /// Only used by the sTokens sync.
    pub time: Option<String>,
    pub token_id: String,
    pub token_name: String,
    pub payload: String,
    pub locked: Option<String>,
}

fn missing_roles() -> Failure {
    Failure::validation("Missing some required field types")
}

impl MintColumns {
    /// Columns for the NFT sync: account, block, t_id, t_name, t_payload.
    pub fn for_nfts(map: &HashMap<String, String>) -> Result<Self, Failure> {
        when_defined_all(
            (
                map.get(ROLE_ACCOUNT),
                map.get(ROLE_BLOCK),
                map.get(ROLE_TOKEN_ID),
                map.get(ROLE_TOKEN_NAME),
                map.get(ROLE_TOKEN_PAYLOAD),
            ),
            |(account, block, token_id, token_name, payload)| Self {
                account: account.clone(),
                block: block.clone(),
                time: None,
                token_id: token_id.clone(),
                token_name: token_name.clone(),
                payload: payload.clone(),
                locked: None,
            },
        )
        .ok_or_else(missing_roles)
    }

    /// Columns for the sTokens sync: the NFT roles plus `time`, with an
    /// optional `t_lock`.
    pub fn for_stokens(map: &HashMap<String, String>) -> Result<Self, Failure> {
        let time = map.get(ROLE_TIME).ok_or_else(missing_roles)?;
        let mut columns = Self::for_nfts(map)?;
        columns.time = Some(time.clone());
        columns.locked = map.get(ROLE_TOKEN_LOCKED).filter(|c| !c.is_empty()).cloned();
        Ok(columns)
    }

    /// Same as [`MintColumns::for_stokens`] for a configured map.
    pub fn for_stokens_config(map: &BTreeMap<String, String>) -> Result<Self, Failure> {
        let map: HashMap<String, String> = map.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        Self::for_stokens(&map)
    }

    /// Lay `row` out under these column names.
    pub fn to_fields(&self, row: &MintRow) -> Fields {
        let mut fields = Fields::new();
        fields.insert(self.account.clone(), json!(row.account));
        fields.insert(self.block.clone(), json!(row.block));
        if let Some(time) = &self.time {
            fields.insert(time.clone(), json!(row.time.clone().unwrap_or_default()));
        }
        fields.insert(self.token_id.clone(), token_id_value(row.token_id));
        fields.insert(self.token_name.clone(), json!(row.token_name));
        fields.insert(self.payload.clone(), row.payload.clone());
        if let Some(locked) = &self.locked {
            fields.insert(locked.clone(), row.locked.clone());
        }
        fields
    }
}

/// Values of one minted token, before column mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct MintRow {
    pub account: String,
    pub block: u64,
    pub time: Option<String>,
    pub token_id: U256,
    pub token_name: String,
    pub payload: Value,
    pub locked: Value,
}

/// Token ids are numbers in the table; ids past `u64` are kept as text.
pub fn token_id_value(id: U256) -> Value {
    match u64::try_from(id) {
        Ok(n) => json!(n),
        Err(_) => json!(id.to_string()),
    }
}
