//! HTTP endpoints bridging the chain and the datastore.
//!
//! # Data Flow
//! ```text
//! query string / path / body
//!     → validation (when_defined_all → Failure::validation)
//!     → datastore and chain steps (when_not_error_all[_async])
//!     → terminal step: Failure or value → HTTP response
//! ```
//!
//! Each module exposes the pipeline as a plain async function over
//! [`AppState`](crate::http::server::AppState) and a thin axum handler.

pub mod access_control;
pub mod exists;
pub mod field_map;
pub mod minted;
pub mod nfts;
pub mod relay;
pub mod stokens;
pub mod tickets;

use std::collections::HashMap;

use crate::error::Failure;
use crate::observability::metrics;

/// Decoded query string, keeping repeated keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn parse(raw: Option<&str>) -> Self {
        let pairs = raw
            .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
            .unwrap_or_default();
        Self { pairs }
    }

    /// First value for `name`. An empty value still counts as present.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// First non-empty value for `name`.
    pub fn get_non_empty(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|v| !v.is_empty())
    }

    /// Every value for `name`, in order.
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }
}

/// Non-empty path segment captured as `name`.
pub fn path_param<'a>(params: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    params.get(name).map(String::as_str).filter(|v| !v.is_empty())
}

/// Log and count a failure at the endpoint boundary.
pub(crate) fn report_failure(endpoint: &'static str, failure: &Failure) {
    tracing::warn!(
        endpoint,
        kind = failure.kind().as_str(),
        error = %failure,
        cause = ?failure.cause_text(),
        "Request failed"
    );
    metrics::record_failure(failure.kind());
}
