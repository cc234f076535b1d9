//! Spreadsheet datastore subsystem.
//!
//! # Data Flow
//! ```text
//! endpoint pipeline
//!     → ops.rs (paging, field-name lookup, upsert, latest value)
//!     → TabularStore (select / create / update)
//!     → airtable.rs (REST over reqwest)
//! ```
//!
//! # Design Decisions
//! - The three primitive calls are the only seam; everything else is built
//!   on them so tests can swap in an in-memory table
//! - Writes are chunked to the API's ten-records-per-call limit by the client
//! - Client errors become `Failure::upstream` at the ops boundary

pub mod airtable;
pub mod formula;
pub mod ops;
pub mod types;

use std::future::Future;

pub use airtable::AirtableClient;
pub use ops::UpsertOutcome;
pub use types::{
    DatastoreError, Fields, Page, Record, SelectQuery, Sort, SortDirection, StoreResult,
};

/// Records per create/update request accepted by the backend.
pub const MAX_RECORDS_PER_WRITE: usize = 10;

/// Primitive operations of a tabular datastore.
pub trait TabularStore: Send + Sync + 'static {
    /// Fetch one page of `table`.
    fn select(
        &self,
        table: &str,
        query: &SelectQuery,
    ) -> impl Future<Output = StoreResult<Page>> + Send;

    /// Insert rows, returning them with their new ids.
    fn create(
        &self,
        table: &str,
        rows: Vec<Fields>,
    ) -> impl Future<Output = StoreResult<Vec<Record>>> + Send;

    /// Patch rows by id, returning the updated rows.
    fn update(
        &self,
        table: &str,
        records: Vec<Record>,
    ) -> impl Future<Output = StoreResult<Vec<Record>>> + Send;
}
