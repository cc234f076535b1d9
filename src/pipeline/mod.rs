//! Short-circuiting request pipelines.
//!
//! # Data Flow
//! ```text
//! query/path params, env, RPC answers
//!     → Option<T>          (may legitimately be unset)
//!     → lift.rs            when_defined / when_defined_all
//!     → Result<T, Failure> (absence turned into a failure by the caller)
//!     → short_circuit.rs   when_not_error / when_not_error_all (+ async forms)
//!     → terminal step maps the final Result to an HTTP response
//! ```
//!
//! # Guarantees
//! - A transform only ever sees fully resolved, successful inputs.
//! - The first failing input, scanning left to right, is the one returned.
//! - Failures are values. Nothing here panics, logs or suspends.
//! - Same inputs and a pure transform give the same output.

pub mod lift;
pub mod short_circuit;

pub use lift::{when_defined, when_defined_all, AllDefined};
pub use short_circuit::{
    when_not_error, when_not_error_all, when_not_error_all_async, when_not_error_async, AllOk,
    Deferred, Share,
};
