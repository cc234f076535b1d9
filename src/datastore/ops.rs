//! Operations composed from the three datastore primitives.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use crate::datastore::formula::{self, ConditionValue};
use crate::datastore::types::{cell_text, Fields, Record, SelectQuery, SortDirection};
use crate::datastore::{TabularStore, MAX_RECORDS_PER_WRITE};
use crate::error::Failure;

/// Follow pagination until the table is exhausted.
pub async fn select_all<S: TabularStore>(
    store: &S,
    table: &str,
    query: SelectQuery,
) -> Result<Vec<Record>, Failure> {
    let mut query = query;
    let mut records = Vec::new();
    loop {
        let page = store.select(table, &query).await?;
        records.extend(page.records);
        match page.offset {
            Some(offset) => query.offset = Some(offset),
            None => return Ok(records),
        }
    }
}

/// Page through `table` until `hit` matches a record.
pub async fn find_first<S, P>(
    store: &S,
    table: &str,
    query: SelectQuery,
    hit: P,
) -> Result<Option<Record>, Failure>
where
    S: TabularStore,
    P: Fn(&Record) -> bool,
{
    let mut query = query;
    loop {
        let page = store.select(table, &query).await?;
        if let Some(found) = page.records.into_iter().find(|r| hit(r)) {
            return Ok(Some(found));
        }
        match page.offset {
            Some(offset) => query.offset = Some(offset),
            None => return Ok(None),
        }
    }
}

/// Resolve a field id (`fldXXXX`) to its display name.
///
/// Selecting a single field by id returns it keyed by name, so the first key
/// of the first row is the answer. Fails when the table has no row with a
/// value in that column.
pub async fn field_name_by_id<S: TabularStore>(
    store: &S,
    table: &str,
    id: &str,
) -> Result<String, Failure> {
    let page = store
        .select(table, &SelectQuery::fields([id]).max_records(1))
        .await?;

    page.records
        .first()
        .and_then(|r| r.fields.keys().next().cloned())
        .ok_or_else(|| Failure::not_found(format!("Failed to fetch the field name: {}", id)))
}

/// Highest numeric value stored in `field`.
pub async fn latest_number<S: TabularStore>(
    store: &S,
    table: &str,
    field: &str,
) -> Result<u64, Failure> {
    let page = store
        .select(
            table,
            &SelectQuery::fields([field])
                .sort_by(field, SortDirection::Desc)
                .max_records(1),
        )
        .await?;

    page.records
        .iter()
        .find_map(|r| r.fields.get(field).and_then(as_block_number))
        .ok_or_else(|| Failure::not_found("Not found"))
}

fn as_block_number(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0 && f.fract() == 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Rows written by [`upsert`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpsertOutcome {
    pub created: Vec<Record>,
    pub updated: Vec<Record>,
}

/// Create or update `rows`, matching existing records on the `key` column.
///
/// Rows without a value for `key` are always created.
pub async fn upsert<S: TabularStore>(
    store: &S,
    table: &str,
    rows: Vec<Fields>,
    key: &str,
) -> Result<UpsertOutcome, Failure> {
    let mut outcome = UpsertOutcome::default();

    for chunk in rows.chunks(MAX_RECORDS_PER_WRITE) {
        let clauses: Vec<String> = chunk
            .iter()
            .filter_map(|row| row.get(key))
            .filter_map(|value| {
                ConditionValue::try_from(value.clone())
                    .ok()
                    .map(|c| formula::condition(key, &c))
            })
            .collect();

        let existing = if clauses.is_empty() {
            Vec::new()
        } else {
            select_all(
                store,
                table,
                SelectQuery::fields([key]).filter(formula::any_of(clauses)),
            )
            .await?
        };

        let mut ids: HashMap<String, String> = HashMap::new();
        for record in existing {
            if let Some(value) = record.text(key) {
                ids.entry(value).or_insert(record.id);
            }
        }

        let mut to_update = Vec::new();
        let mut to_create = Vec::new();
        for row in chunk {
            let id = row.get(key).and_then(cell_text).and_then(|v| ids.get(&v));
            match id {
                Some(id) => to_update.push(Record {
                    id: id.clone(),
                    fields: row.clone(),
                    created_time: None,
                }),
                None => to_create.push(row.clone()),
            }
        }

        if !to_update.is_empty() {
            outcome.updated.extend(store.update(table, to_update).await?);
        }
        if !to_create.is_empty() {
            outcome.created.extend(store.create(table, to_create).await?);
        }
    }

    tracing::info!(
        table = %table,
        created = outcome.created.len(),
        updated = outcome.updated.len(),
        "Upsert complete"
    );
    Ok(outcome)
}
