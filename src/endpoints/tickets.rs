//! `POST /api/webhooks/tickets/{key}/dest/airtable/{table}`
//!
//! Records a used ticket benefit as one new row. The body carries
//! `{status, id, account, benefit: {id, description}}`; the configured
//! `tickets.fields` map decides which of these land in which column.

use std::collections::{BTreeMap, HashMap};

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::datastore::{Fields, Record, TabularStore};
use crate::endpoints::{path_param, report_failure};
use crate::error::Failure;
use crate::http::response::{self, failure_message, Cors};
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::pipeline::{when_defined_all, when_not_error, when_not_error_all, when_not_error_all_async, Share};

const ENDPOINT: &str = "tickets";

/// Roles a ticket column can be mapped from, in column order.
pub const TICKET_ROLES: [&str; 5] = ["status", "id", "account", "benefit_id", "benefit_description"];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TicketBody {
    pub status: Option<Value>,
    /// sTokens id.
    pub id: Option<Value>,
    pub account: Option<Value>,
    pub benefit: Option<Benefit>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Benefit {
    pub id: Option<Value>,
    pub description: Option<Value>,
}

impl TicketBody {
    fn value_for(&self, role: &str) -> Option<&Value> {
        let benefit = self.benefit.as_ref();
        match role {
            "status" => self.status.as_ref(),
            "id" => self.id.as_ref(),
            "account" => self.account.as_ref(),
            "benefit_id" => benefit.and_then(|b| b.id.as_ref()),
            "benefit_description" => benefit.and_then(|b| b.description.as_ref()),
            _ => None,
        }
    }
}

/// Decode the webhook body. Only a JSON object is a ticket; serde would
/// otherwise map an array onto the fields by position.
pub fn parse_ticket(body: &[u8]) -> Result<TicketBody, Failure> {
    match serde_json::from_slice::<Value>(body)? {
        value @ Value::Object(_) => Ok(serde_json::from_value(value)?),
        other => Err(Failure::validation(format!(
            "Malformed JSON: expected an object, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Lay out `body` under the mapped columns. Unmapped roles and values the
/// body does not carry are left out.
pub fn ticket_fields(map: &BTreeMap<String, String>, body: &TicketBody) -> Fields {
    TICKET_ROLES
        .iter()
        .filter_map(|role| {
            let column = map.get(*role).filter(|c| !c.is_empty())?;
            let value = body.value_for(role)?;
            Some((column.clone(), value.clone()))
        })
        .collect()
}

/// Validate the webhook and create the ticket row.
pub async fn record_ticket<S: TabularStore>(
    state: &AppState<S>,
    params: &HashMap<String, String>,
    body: &[u8],
) -> Result<Vec<Record>, Failure> {
    let props = when_defined_all((path_param(params, "key"), path_param(params, "table")), |p| p)
        .ok_or_else(|| {
            Failure::validation("Missing required path paramater: /[key]/dest/airtable/[table]")
        });

    let valid_key = when_not_error(props.share(), |&(key, _)| {
        match state.config.tickets.key.as_deref() {
            Some(expected) if expected == key => Ok(()),
            _ => Err(Failure::rule("Invalid key")),
        }
    });

    let body = parse_ticket(body);
    let map = Some(&state.config.tickets.fields)
        .filter(|m| !m.is_empty())
        .ok_or_else(|| Failure::validation("WEBHOOK_TICKETS_FIELDS is missing"));

    let fields = when_not_error_all((body, map), |(body, map)| Ok(ticket_fields(map, &body)));

    when_not_error_all_async(
        (props, fields, valid_key),
        |((_, table), fields, ())| async move {
            let created = state
                .store
                .create(table, vec![fields])
                .await
                .map_err(Failure::from)?;
            metrics::record_rows_written(table, created.len());
            tracing::info!(table = %table, records = created.len(), "Ticket recorded");
            Ok(created)
        },
    )
    .await
}

pub async fn handler<S: TabularStore>(
    State(state): State<AppState<S>>,
    Path(params): Path<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    let response = match record_ticket(&state, &params, &body).await {
        Ok(records) => response::json(
            StatusCode::OK,
            &json!({ "message": "success", "data": records }),
            Cors::Allow,
        ),
        Err(failure) => {
            report_failure(ENDPOINT, &failure);
            failure_message(&failure, Cors::Allow)
        }
    };

    metrics::record_request(ENDPOINT, response.status().as_u16());
    response
}
