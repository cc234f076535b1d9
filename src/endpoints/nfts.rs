//! `GET /api/webhooks/nfts/{propertyAddress}/airtable/{table}?fields&fromBlock`
//!
//! Copies newly minted tokens whose metadata `Destination` is the property
//! into the table. The body is `"1"` when the chain scan itself succeeded,
//! whatever happened while writing rows.

use std::collections::HashMap;

use alloy::primitives::Address;
use axum::extract::{Path, RawQuery, State};
use axum::response::Response;
use futures_util::future::join_all;

use crate::chain::stokens::decode_minted;
use crate::chain::{MintedEvent, TokenMetadata};
use crate::datastore::{Fields, TabularStore};
use crate::endpoints::field_map::{parse_pairs, MintColumns, MintRow};
use crate::endpoints::minted::{
    attribute_or_empty, next_block, parse_from_block, property_matches, stokens_address,
    ATTR_DESTINATION, ATTR_PAYLOAD,
};
use crate::endpoints::{path_param, report_failure, QueryParams};
use crate::error::Failure;
use crate::http::response;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::pipeline::{
    when_defined_all, when_not_error, when_not_error_all, when_not_error_all_async,
    when_not_error_async, AllOk, Share,
};

const ENDPOINT: &str = "nfts";

/// Outcome of one NFT sync run.
#[derive(Debug)]
pub struct NftSync {
    /// Number of `Minted` logs fetched.
    pub fetched: Result<usize, Failure>,
    /// Rows created in the table.
    pub written: Result<usize, Failure>,
}

struct MatchedToken {
    event: MintedEvent,
    metadata: TokenMetadata,
    owner: Address,
}

fn destined_for(metadata: &TokenMetadata, property: &str) -> bool {
    metadata
        .attribute_text(ATTR_DESTINATION)
        .is_some_and(|dest| property_matches(&dest, property))
}

fn nft_row(columns: &MintColumns, token: &MatchedToken) -> Fields {
    columns.to_fields(&MintRow {
        account: token.owner.to_string(),
        block: token.event.block_number,
        time: None,
        token_id: token.event.token_id,
        token_name: token.metadata.name.clone(),
        payload: attribute_or_empty(&token.metadata, ATTR_PAYLOAD),
        locked: serde_json::Value::Null,
    })
}

/// Tokens of `events` destined for `property`, with their current owner.
async fn matching_tokens<S: TabularStore>(
    state: &AppState<S>,
    contract: Address,
    property: &str,
    events: Vec<MintedEvent>,
) -> Result<Vec<MatchedToken>, Failure> {
    let chain = &state.chain;
    let queue = &state.queue;

    let metadata = join_all(events.iter().map(|event| {
        queue.run(chain.token_metadata(contract, event.token_id))
    }))
    .await
    .all_ok()?;

    let candidates: Vec<(MintedEvent, TokenMetadata)> = events
        .into_iter()
        .zip(metadata)
        .filter(|(_, metadata)| destined_for(metadata, property))
        .collect();

    let owners = join_all(candidates.iter().map(|(event, _)| {
        queue.run(chain.owner_of(contract, event.token_id))
    }))
    .await
    .all_ok()?;

    Ok(candidates
        .into_iter()
        .zip(owners)
        .map(|((event, metadata), owner)| MatchedToken { event, metadata, owner })
        .collect())
}

pub async fn sync_nfts<S: TabularStore>(
    state: &AppState<S>,
    params: &HashMap<String, String>,
    query: &QueryParams,
) -> NftSync {
    let store = state.store.as_ref();

    let fields = query
        .get("fields")
        .ok_or_else(|| Failure::validation("Missing required paramater: ?fields"));
    let from_block = parse_from_block(query.get("fromBlock"));
    let props = when_defined_all(
        (path_param(params, "propertyAddress"), path_param(params, "table")),
        |p| p,
    )
    .ok_or_else(|| Failure::validation("Missing required path paramater: /[table]"));

    let columns = when_not_error(fields, |raw| MintColumns::for_nfts(&parse_pairs(raw)?));
    let contract = stokens_address(&state.config);

    let stored = when_not_error_all((props.share(), columns.share()), |(&(_, table), columns)| {
        Ok((table, columns.block.as_str()))
    });
    let start = when_not_error_async(from_block, |from| async move {
        Ok::<_, Failure>(next_block(store, stored, from).await)
    })
    .await;

    let logs = when_not_error_all_async((contract.share(), start), |(&contract, start)| async move {
        state
            .queue
            .run(state.chain.minted_logs(contract, start))
            .await
            .map_err(Failure::from)
    })
    .await;
    let fetched = logs.share().map(Vec::len);

    let events = when_not_error(logs, |logs| decode_minted(&logs).map_err(Failure::from));

    let tokens = when_not_error_all_async(
        (events, contract.share(), props.share()),
        |(events, &contract, &(property, _))| matching_tokens(state, contract, property, events),
    )
    .await;

    let rows = when_not_error_all((columns.share(), tokens), |(columns, tokens)| {
        Ok(tokens.iter().map(|t| nft_row(columns, t)).collect::<Vec<_>>())
    });

    let written = when_not_error_all_async((props.share(), rows), |(&(_, table), rows)| async move {
        if rows.is_empty() {
            return Ok(0);
        }
        let created = store.create(table, rows).await.map_err(Failure::from)?;
        metrics::record_rows_written(table, created.len());
        Ok(created.len())
    })
    .await;

    tracing::info!(
        fetched = ?fetched.as_ref().ok(),
        written = ?written.as_ref().ok(),
        "NFT sync finished"
    );
    NftSync { fetched, written }
}

pub async fn handler<S: TabularStore>(
    State(state): State<AppState<S>>,
    Path(params): Path<HashMap<String, String>>,
    RawQuery(raw): RawQuery,
) -> Response {
    let query = QueryParams::parse(raw.as_deref());
    let sync = sync_nfts(&state, &params, &query).await;

    // the scan and the write usually fail for the same reason
    match (&sync.fetched, &sync.written) {
        (Err(failure), _) | (Ok(_), Err(failure)) => report_failure(ENDPOINT, failure),
        _ => {}
    }

    let response = response::flag(sync.fetched.is_ok());
    metrics::record_request(ENDPOINT, response.status().as_u16());
    response
}
