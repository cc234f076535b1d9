//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → request.rs (request ID, trace span)
//!     → server.rs (timeout, body limit, routing)
//!     → auth.rs (bearer check, relay routes only)
//!     → endpoints (pipeline)
//!     → response.rs (JSON / flag bodies, CORS, status)
//! ```

pub mod auth;
pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{build_router, AppState, HttpServer, StateError};
