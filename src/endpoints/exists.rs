//! `GET /api/airtable/exists/{table}?account&field`

use std::collections::HashMap;

use axum::extract::{Path, RawQuery, State};
use axum::http::StatusCode;
use axum::response::Response;
use serde_json::{json, Value};

use crate::datastore::{formula, ops, SelectQuery, TabularStore};
use crate::endpoints::{path_param, report_failure, QueryParams};
use crate::error::Failure;
use crate::http::response::{self, status_for, Cors};
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::pipeline::{when_defined, when_defined_all, when_not_error_all_async};

const ENDPOINT: &str = "exists";

/// Succeeds when some row of `table` holds `account` in `field`.
///
/// Every page is scanned until a row matches exactly.
pub async fn account_exists<S: TabularStore>(
    store: &S,
    params: &HashMap<String, String>,
    query: &QueryParams,
) -> Result<(), Failure> {
    let query = when_defined_all((query.get("account"), query.get("field")), |pair| pair)
        .ok_or_else(|| Failure::validation("Missing required paramater: ?account, ?field"));
    let table = when_defined(path_param(params, "table"), |t| t)
        .ok_or_else(|| Failure::validation("Missing required path paramater: /[table]/"));

    when_not_error_all_async((query, table), |((account, field), table)| async move {
        let select = SelectQuery::fields([field]).filter(formula::equals(field, account));
        let hit = ops::find_first(store, table, select, |record| {
            record.fields.get(field).and_then(Value::as_str) == Some(account)
        })
        .await?;
        hit.map(|_| ()).ok_or_else(|| Failure::not_found("Not found"))
    })
    .await
}

pub async fn handler<S: TabularStore>(
    State(state): State<AppState<S>>,
    Path(params): Path<HashMap<String, String>>,
    RawQuery(raw): RawQuery,
) -> Response {
    let query = QueryParams::parse(raw.as_deref());

    let response = match account_exists(state.store.as_ref(), &params, &query).await {
        Ok(()) => response::json(StatusCode::OK, &json!({ "message": "success" }), Cors::Omit),
        Err(failure) => {
            report_failure(ENDPOINT, &failure);
            response::json(
                status_for(&failure),
                &json!({ "message": "error", "error": failure.message() }),
                Cors::Omit,
            )
        }
    };

    metrics::record_request(ENDPOINT, response.status().as_u16());
    response
}
