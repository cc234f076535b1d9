//! On-chain to datastore sync service.
//!
//! HTTP endpoints that mirror minted tokens into a spreadsheet datastore,
//! gate access on its rows, record ticket webhooks and relay signed
//! swap-and-stake transactions. Every endpoint is a short-circuiting
//! pipeline built from the combinators in [`pipeline`].

// Core subsystems
pub mod config;
pub mod endpoints;
pub mod error;
pub mod http;
pub mod pipeline;

// Collaborators
pub mod chain;
pub mod datastore;
pub mod queue;
pub mod replay;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::AppConfig;
pub use error::{Failure, FailureKind};
pub use http::{AppState, HttpServer};
pub use lifecycle::Shutdown;
