//! Datastore records, queries and errors.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::error::Failure;

/// Column name to cell value.
pub type Fields = serde_json::Map<String, Value>;

/// One row of a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(default)]
    pub fields: Fields,
    #[serde(rename = "createdTime", default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<String>,
}

impl Record {
    /// Cell value rendered as text, if present.
    pub fn text(&self, field: &str) -> Option<String> {
        self.fields.get(field).and_then(cell_text)
    }
}

/// Cell value rendered as text: strings as-is, numbers and booleans printed,
/// anything else absent.
pub fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub direction: SortDirection,
}

/// Parameters of a `select` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectQuery {
    /// Only return these columns. Empty means all.
    pub fields: Vec<String>,
    pub filter_by_formula: Option<String>,
    pub sort: Vec<Sort>,
    pub max_records: Option<u32>,
    pub page_size: Option<u32>,
    /// Continuation token from a previous page.
    pub offset: Option<String>,
}

impl SelectQuery {
    pub fn fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn filter(mut self, formula: impl Into<String>) -> Self {
        self.filter_by_formula = Some(formula.into());
        self
    }

    pub fn sort_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort.push(Sort {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn max_records(mut self, max: u32) -> Self {
        self.max_records = Some(max);
        self
    }
}

/// One page of a `select`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub records: Vec<Record>,
    #[serde(default)]
    pub offset: Option<String>,
}

/// Errors raised by a datastore client.
#[derive(Debug, Error)]
pub enum DatastoreError {
    /// Base id or API key missing.
    #[error("Datastore not configured: {0}")]
    NotConfigured(&'static str),

    /// Transport-level failure.
    #[error("Datastore request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with an error status.
    #[error("Datastore returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The answer could not be understood.
    #[error("Unexpected datastore response: {0}")]
    Decode(String),
}

pub type StoreResult<T> = Result<T, DatastoreError>;

impl From<DatastoreError> for Failure {
    fn from(err: DatastoreError) -> Self {
        match err {
            DatastoreError::NotConfigured(_) => Failure::validation(err.to_string()).with_cause(err),
            _ => Failure::upstream(err.to_string()).with_cause(err),
        }
    }
}
