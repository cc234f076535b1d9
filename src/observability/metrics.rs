//! Metrics collection and exposition.
//!
//! # Metrics
//! - `sync_requests_total` (counter): requests by endpoint and status
//! - `sync_failures_total` (counter): failed pipelines by failure kind
//! - `sync_records_written_total` (counter): datastore rows written by table
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so tests need no setup
//! - Prometheus exporter only when enabled in config

use std::net::SocketAddr;

use metrics::counter;
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::FailureKind;

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(endpoint: &'static str, status: u16) {
    counter!("sync_requests_total", "endpoint" => endpoint, "status" => status.to_string())
        .increment(1);
}

pub fn record_failure(kind: FailureKind) {
    counter!("sync_failures_total", "kind" => kind.as_str()).increment(1);
}

pub fn record_rows_written(table: &str, count: usize) {
    counter!("sync_records_written_total", "table" => table.to_string()).increment(count as u64);
}
