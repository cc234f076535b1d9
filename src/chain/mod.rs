//! Chain integration subsystem.
//!
//! # Data Flow
//! ```text
//! reads:  ChainClient (failover, timeouts)
//!     → stokens.rs (Minted logs, receipts, tokenURI, ownerOf)
//!     → metadata.rs (data URI → TokenMetadata)
//!
//! relay:  wallet.rs (key or phrase from secrets)
//!     → transaction.rs (fees, gas estimate, sign, broadcast)
//! ```
//!
//! # Security Constraints
//! - Key material only from configuration secrets
//! - Never log private keys or phrases
//! - All RPC calls have configurable timeouts

pub mod client;
pub mod contracts;
pub mod fees;
pub mod metadata;
pub mod stokens;
pub mod transaction;
pub mod types;
pub mod wallet;

pub use client::ChainClient;
pub use fees::FeeData;
pub use metadata::TokenMetadata;
pub use stokens::{FromBlock, MintedEvent};
pub use transaction::TxSender;
pub use types::{iso_timestamp, ChainError, ChainId, ChainResult};
pub use wallet::Wallet;
