//! Account gating against a datastore table.
//!
//! Both routes answer `"1"` when the account is listed and `"0"` otherwise,
//! always with status 200 and CORS so browsers can call them directly.
//!
//! - `GET /api/access-control/airtable/{table}?account&field` matches on a
//!   column given by name.
//! - `GET /api/access-control/airtable/{table}/{field}?account&additional-conditions=...`
//!   matches on a column given by id, plus any number of extra
//!   `[field_id, value]` conditions.

use std::collections::HashMap;

use axum::extract::{Path, RawQuery, State};
use axum::response::Response;
use futures_util::future::join_all;
use serde_json::Value;

use crate::datastore::formula::{self, ConditionValue};
use crate::datastore::{ops, Record, SelectQuery, TabularStore};
use crate::endpoints::{path_param, report_failure, QueryParams};
use crate::error::{Failure, FailureKind};
use crate::http::response;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::pipeline::{
    when_defined_all, when_not_error, when_not_error_all, when_not_error_all_async,
    when_not_error_async, AllOk, Share,
};

const ENDPOINT_BY_NAME: &str = "access_control";
const ENDPOINT_BY_ID: &str = "access_control_by_id";

/// Query parameter carrying one JSON `[field_id, value]` condition.
pub const ADDITIONAL_CONDITIONS: &str = "additional-conditions";

/// Only the first page is inspected; a formula this narrow rarely spans more.
fn first_page_hit(records: &[Record], field: &str, account: &str) -> Result<(), Failure> {
    records
        .iter()
        .find(|r| r.fields.get(field).and_then(Value::as_str) == Some(account))
        .map(|_| ())
        .ok_or_else(|| Failure::not_found("Not found"))
}

/// Access check on a column named in the query.
pub async fn check_by_field_name<S: TabularStore>(
    store: &S,
    params: &HashMap<String, String>,
    query: &QueryParams,
) -> Result<(), Failure> {
    let query = when_defined_all((query.get("account"), query.get("field")), |pair| pair)
        .ok_or_else(|| Failure::validation("Missing required paramater: ?account, ?field"));
    let table = path_param(params, "table")
        .ok_or_else(|| Failure::validation("Missing required path paramater: /[table]"));

    let filter = when_not_error(query.share(), |&(account, field)| {
        Ok(formula::equals(field, account))
    });

    when_not_error_all_async(
        (query, filter, table),
        |((account, field), filter, table)| async move {
            let page = store
                .select(table, &SelectQuery::fields([field]).filter(filter))
                .await?;
            first_page_hit(&page.records, field, account)
        },
    )
    .await
}

/// Decode every `additional-conditions` value. One malformed entry fails the lot.
pub fn parse_conditions(raw: &[&str]) -> Result<Vec<(String, ConditionValue)>, Failure> {
    raw.iter()
        .map(|entry| {
            let (field, value): (String, Value) = serde_json::from_str(entry)?;
            Ok((field, ConditionValue::try_from(value)?))
        })
        .collect()
}

/// `{field}="account"`, AND-ed with each extra condition.
pub fn access_formula(field: &str, account: &str, conditions: &[(String, ConditionValue)]) -> String {
    let mut clauses = vec![formula::equals(field, account)];
    clauses.extend(conditions.iter().map(|(name, value)| formula::condition(name, value)));
    formula::all_of(clauses)
}

/// Access check on a column given by id, with optional extra conditions.
pub async fn check_by_field_id<S: TabularStore>(
    store: &S,
    params: &HashMap<String, String>,
    query: &QueryParams,
) -> Result<(), Failure> {
    let account = query
        .get("account")
        .ok_or_else(|| Failure::validation("Missing required paramater: ?account"));
    let conditions = parse_conditions(&query.get_all(ADDITIONAL_CONDITIONS));
    let props = when_defined_all((path_param(params, "table"), path_param(params, "field")), |p| p)
        .ok_or_else(|| Failure::validation("Missing required path paramater: /[table]/[field]"));

    let field_name = when_not_error_async(props.share(), |&(table, field_id)| {
        ops::field_name_by_id(store, table, field_id)
    })
    .await;

    let named_conditions = when_not_error_all_async(
        (conditions, props.share()),
        |(conditions, &(table, _))| async move {
            join_all(conditions.into_iter().map(|(field_id, value)| async move {
                ops::field_name_by_id(store, table, &field_id)
                    .await
                    .map(|name| (name, value))
            }))
            .await
            .all_ok()
        },
    )
    .await;

    let filter = when_not_error_all(
        (account.share(), named_conditions, field_name.share()),
        |(account, conditions, field)| Ok(access_formula(field, account, &conditions)),
    );

    when_not_error_all_async(
        (account, filter, props, field_name),
        |(account, filter, (table, _), field)| async move {
            let page = store
                .select(table, &SelectQuery::fields([field.as_str()]).filter(filter))
                .await?;
            first_page_hit(&page.records, &field, account)
        },
    )
    .await
}

fn flag_response(endpoint: &'static str, result: Result<(), Failure>) -> Response {
    if let Err(failure) = &result {
        if failure.kind() == FailureKind::NotFound {
            tracing::debug!(endpoint, "Account not listed");
        } else {
            report_failure(endpoint, failure);
        }
    }
    let response = response::flag(result.is_ok());
    metrics::record_request(endpoint, response.status().as_u16());
    response
}

pub async fn by_field_name<S: TabularStore>(
    State(state): State<AppState<S>>,
    Path(params): Path<HashMap<String, String>>,
    RawQuery(raw): RawQuery,
) -> Response {
    let query = QueryParams::parse(raw.as_deref());
    let result = check_by_field_name(state.store.as_ref(), &params, &query).await;
    flag_response(ENDPOINT_BY_NAME, result)
}

pub async fn by_field_id<S: TabularStore>(
    State(state): State<AppState<S>>,
    Path(params): Path<HashMap<String, String>>,
    RawQuery(raw): RawQuery,
) -> Response {
    let query = QueryParams::parse(raw.as_deref());
    let result = check_by_field_id(state.store.as_ref(), &params, &query).await;
    flag_response(ENDPOINT_BY_ID, result)
}
