//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, defaults for missing sections)
//!     → loader.rs (overlay secrets and overrides from the environment)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → shared via Arc with every handler
//! ```
//!
//! # Design Decisions
//! - Read once at startup; handlers never look at the environment
//! - All fields have defaults to allow minimal configs
//! - Wallet secrets are environment-only and redacted from Debug output

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AppConfig, AuthConfig, ChainConfig, CronConfig, DatastoreConfig, ListenerConfig,
    ObservabilityConfig, RelayConfig, Secrets, TicketsConfig,
};
