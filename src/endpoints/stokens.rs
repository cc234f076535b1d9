//! sTokens sync into a datastore table.
//!
//! - `GET /api/webhooks/s-tokens/{propertyAddress}/airtable/{table}?fields&primaryKey&fromBlock`
//!   takes the target from the request.
//! - `GET /api/crons/s-tokens/dest/airtable?fromBlock` takes it from the
//!   `cron` section of the config.
//!
//! Both scan `Minted` events for the property, resolve owner, mint time and
//! metadata of each token through the task queue, then upsert one row per
//! token keyed on the primary-key column.

use std::collections::HashMap;

use alloy::primitives::Address;
use axum::extract::{Path, RawQuery, State};
use axum::http::StatusCode;
use axum::response::Response;
use futures_util::future::join_all;
use serde_json::json;

use crate::chain::{ChainError, MintedEvent, TokenMetadata};
use crate::config::CronConfig;
use crate::datastore::{ops, Fields, TabularStore, UpsertOutcome};
use crate::endpoints::field_map::{parse_pairs, MintColumns, MintRow};
use crate::endpoints::minted::{
    attribute_or_empty, next_block, parse_from_block, property_matches, stokens_address,
    ATTR_LOCKED_AMOUNT, ATTR_PAYLOAD,
};
use crate::endpoints::{path_param, report_failure, QueryParams};
use crate::error::Failure;
use crate::http::response::{self, status_for, Cors};
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::pipeline::{
    when_defined_all, when_not_error, when_not_error_all, when_not_error_all_async, AllOk, Share,
};

const WEBHOOK_ENDPOINT: &str = "stokens_webhook";
const CRON_ENDPOINT: &str = "stokens_cron";

/// Where synced rows go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTarget {
    pub property: String,
    pub table: String,
    pub columns: MintColumns,
    pub primary_key: String,
}

/// Target described by the webhook path and query.
pub fn webhook_target(
    params: &HashMap<String, String>,
    query: &QueryParams,
) -> Result<SyncTarget, Failure> {
    let wanted = when_defined_all((query.get("fields"), query.get("primaryKey")), |q| q)
        .ok_or_else(|| Failure::validation("Missing required paramater: ?fields, ?primaryKey"));
    let props = when_defined_all(
        (path_param(params, "propertyAddress"), path_param(params, "table")),
        |p| p,
    )
    .ok_or_else(|| Failure::validation("Missing required path paramater: /[table]"));

    let columns = when_not_error(wanted.share(), |&(fields, _)| {
        MintColumns::for_stokens(&parse_pairs(fields)?)
    });

    when_not_error_all(
        (props, wanted, columns),
        |((property, table), (_, primary_key), columns)| {
            Ok(SyncTarget {
                property: property.to_string(),
                table: table.to_string(),
                columns,
                primary_key: primary_key.to_string(),
            })
        },
    )
}

/// Target from the `cron` config section.
pub fn cron_target(cron: &CronConfig) -> Result<SyncTarget, Failure> {
    let settings = when_defined_all(
        (
            cron.property_address.as_deref().filter(|v| !v.is_empty()),
            cron.table.as_deref().filter(|v| !v.is_empty()),
            Some(&cron.fields).filter(|f| !f.is_empty()),
            cron.primary_key.as_deref().filter(|v| !v.is_empty()),
        ),
        |settings| settings,
    )
    .ok_or_else(|| {
        Failure::validation(
            "Missing required env: PROPERTY_ADDRESS, CRON_STOKENS_TABLE, CRON_STOKENS_FIELDS, CRON_STOKENS_PRIMARY_KEY",
        )
    });

    when_not_error(settings, |(property, table, fields, primary_key)| {
        Ok(SyncTarget {
            property: property.to_string(),
            table: table.to_string(),
            columns: MintColumns::for_stokens_config(fields)?,
            primary_key: primary_key.to_string(),
        })
    })
}

/// One event with everything its row needs.
#[derive(Debug, Clone)]
struct ResolvedToken {
    event: MintedEvent,
    owner: Option<Address>,
    minted_at: Option<String>,
    metadata: TokenMetadata,
}

fn stoken_row(columns: &MintColumns, token: &ResolvedToken) -> Fields {
    columns.to_fields(&MintRow {
        account: token.owner.map(|a| a.to_string()).unwrap_or_default(),
        block: token.event.block_number,
        time: token.minted_at.clone(),
        token_id: token.event.token_id,
        token_name: token.metadata.name.clone(),
        payload: attribute_or_empty(&token.metadata, ATTR_PAYLOAD),
        locked: attribute_or_empty(&token.metadata, ATTR_LOCKED_AMOUNT),
    })
}

/// Owner, mint time and metadata of one event. Each RPC call waits for a
/// queue slot.
async fn resolve_token<S: TabularStore>(
    state: &AppState<S>,
    contract: Address,
    event: MintedEvent,
) -> Result<ResolvedToken, Failure> {
    let chain = &state.chain;
    let queue = &state.queue;

    let owner = match event.transaction_hash {
        Some(hash) => queue.run(chain.minted_to(contract, hash)).await?,
        None => None,
    };

    let minted_at = match queue.run(chain.get_block_timestamp(event.block_number)).await {
        Ok(time) => Some(time),
        Err(ChainError::NotFound(_)) => None,
        Err(e) => return Err(e.into()),
    };

    let metadata = queue.run(chain.token_metadata(contract, event.token_id)).await?;

    Ok(ResolvedToken {
        event,
        owner,
        minted_at,
        metadata,
    })
}

/// Scan, resolve and upsert.
pub async fn sync_stokens<S: TabularStore>(
    state: &AppState<S>,
    target: Result<SyncTarget, Failure>,
    from_block: Result<Option<u64>, Failure>,
) -> Result<UpsertOutcome, Failure> {
    let store = state.store.as_ref();
    let contract = stokens_address(&state.config);

    let start = when_not_error_all_async((target.share(), from_block), |(target, from)| async move {
        let stored = Ok((target.table.as_str(), target.columns.block.as_str()));
        Ok::<_, Failure>(next_block(store, stored, from).await)
    })
    .await;

    let events = when_not_error_all_async((contract.share(), start), |(&contract, start)| async move {
        state
            .queue
            .run(state.chain.minted_events(contract, start))
            .await
            .map_err(Failure::from)
    })
    .await;

    let tokens = when_not_error_all_async(
        (events, contract.share(), target.share()),
        |(events, &contract, target)| async move {
            let wanted = events
                .into_iter()
                .filter(|e| property_matches(&e.property.to_string(), &target.property));
            join_all(wanted.map(|event| resolve_token(state, contract, event)))
                .await
                .all_ok()
        },
    )
    .await;

    let rows = when_not_error_all((target.share(), tokens), |(target, tokens)| {
        Ok(tokens
            .iter()
            .map(|t| stoken_row(&target.columns, t))
            .collect::<Vec<_>>())
    });

    when_not_error_all_async((target, rows), |(target, rows)| async move {
        let outcome = ops::upsert(store, &target.table, rows, &target.primary_key).await?;
        metrics::record_rows_written(
            &target.table,
            outcome.created.len() + outcome.updated.len(),
        );
        Ok::<_, Failure>(outcome)
    })
    .await
}

fn sync_response(endpoint: &'static str, result: Result<UpsertOutcome, Failure>) -> Response {
    let response = match result {
        Ok(outcome) => response::json(StatusCode::OK, &outcome, Cors::Allow),
        Err(failure) => {
            report_failure(endpoint, &failure);
            response::json(
                status_for(&failure),
                &json!({ "error": failure.message() }),
                Cors::Allow,
            )
        }
    };
    metrics::record_request(endpoint, response.status().as_u16());
    response
}

pub async fn webhook_handler<S: TabularStore>(
    State(state): State<AppState<S>>,
    Path(params): Path<HashMap<String, String>>,
    RawQuery(raw): RawQuery,
) -> Response {
    let query = QueryParams::parse(raw.as_deref());
    let target = webhook_target(&params, &query);
    let from_block = parse_from_block(query.get("fromBlock"));
    sync_response(WEBHOOK_ENDPOINT, sync_stokens(&state, target, from_block).await)
}

pub async fn cron_handler<S: TabularStore>(
    State(state): State<AppState<S>>,
    RawQuery(raw): RawQuery,
) -> Response {
    let query = QueryParams::parse(raw.as_deref());
    let target = cron_target(&state.config.cron);
    let from_block = parse_from_block(query.get("fromBlock"));
    sync_response(CRON_ENDPOINT, sync_stokens(&state, target, from_block).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::U256;

    const FIELDS: &str = r#"[["account","Wallet"],["block","Block"],["time","Minted At"],["t_id","Token"],["t_name","Name"],["t_payload","Payload"],["t_lock","Locked"]]"#;

    fn params() -> HashMap<String, String> {
        HashMap::from([
            ("propertyAddress".to_string(), "0xProp".to_string()),
            ("table".to_string(), "Tokens".to_string()),
        ])
    }

    #[test]
    fn test_webhook_target() {
        let raw = format!(
            "fields={}&primaryKey=Token",
            url::form_urlencoded::byte_serialize(FIELDS.as_bytes()).collect::<String>()
        );
        let target = webhook_target(&params(), &QueryParams::parse(Some(&raw))).unwrap();
        assert_eq!(target.table, "Tokens");
        assert_eq!(target.primary_key, "Token");
        assert_eq!(target.columns.locked.as_deref(), Some("Locked"));
    }

    #[test]
    fn test_webhook_target_failure_order() {
        // path is checked before the query
        let err = webhook_target(&HashMap::new(), &QueryParams::parse(Some("fields=[]"))).unwrap_err();
        assert_eq!(err.message(), "Missing required path paramater: /[table]");

        let err = webhook_target(&params(), &QueryParams::parse(None)).unwrap_err();
        assert_eq!(err.message(), "Missing required paramater: ?fields, ?primaryKey");

        let err = webhook_target(&params(), &QueryParams::parse(Some("fields=[]&primaryKey=Token")))
            .unwrap_err();
        assert_eq!(err.message(), "Missing some required field types");
    }

    #[test]
    fn test_cron_target_requires_every_setting() {
        let mut cron = CronConfig::default();
        let err = cron_target(&cron).unwrap_err();
        assert!(err.message().starts_with("Missing required env: PROPERTY_ADDRESS"));

        cron.property_address = Some("0xProp".into());
        cron.table = Some("Tokens".into());
        cron.primary_key = Some("Token".into());
        cron.fields = parse_pairs(FIELDS).unwrap().into_iter().collect();
        let target = cron_target(&cron).unwrap();
        assert_eq!(target.columns.time.as_deref(), Some("Minted At"));
    }

    #[test]
    fn test_stoken_row_defaults() {
        let columns = MintColumns::for_stokens(&parse_pairs(FIELDS).unwrap()).unwrap();
        let token = ResolvedToken {
            event: MintedEvent {
                token_id: U256::from(4),
                owner: Address::ZERO,
                property: Address::ZERO,
                amount: U256::ZERO,
                block_number: 12,
                log_index: 0,
                transaction_hash: None,
            },
            owner: None,
            minted_at: None,
            metadata: TokenMetadata::default(),
        };

        let row = stoken_row(&columns, &token);
        assert_eq!(row["Wallet"], json!(""));
        assert_eq!(row["Minted At"], json!(""));
        assert_eq!(row["Block"], json!(12));
        assert_eq!(row["Payload"], json!(""));
        assert_eq!(row["Locked"], json!(""));
    }
}
