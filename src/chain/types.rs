//! Chain-specific types and error definitions.

use chrono::{DateTime, SecondsFormat};
use thiserror::Error;

use crate::error::Failure;

/// Chain ID type for strong typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainId(pub u64);

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ChainId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors that can occur during chain operations.
#[derive(Debug, Error)]
pub enum ChainError {
    /// RPC connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// RPC URL could not be parsed.
    #[error("Invalid RPC URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Invalid private key or mnemonic.
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// Contract return data or event log could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Requested block or receipt does not exist.
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Result type for chain operations.
pub type ChainResult<T> = Result<T, ChainError>;

impl From<ChainError> for Failure {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::Wallet(_) => Failure::rule("wallet error").with_cause(err),
            ChainError::InvalidUrl { .. } => Failure::validation(err.to_string()).with_cause(err),
            ChainError::NotFound(_) => Failure::not_found(err.to_string()).with_cause(err),
            _ => Failure::upstream(err.to_string()).with_cause(err),
        }
    }
}

/// Unix seconds as an ISO-8601 UTC string with millisecond precision.
pub fn iso_timestamp(secs: u64) -> Option<String> {
    let secs = i64::try_from(secs).ok()?;
    DateTime::from_timestamp(secs, 0).map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;

    #[test]
    fn test_chain_id_display() {
        assert_eq!(ChainId::from(137u64).to_string(), "137");
    }

    #[test]
    fn test_error_display() {
        let err = ChainError::Timeout(10);
        assert_eq!(err.to_string(), "RPC timeout after 10 seconds");
    }

    #[test]
    fn test_failure_mapping() {
        let failure = Failure::from(ChainError::Wallet("bad phrase".into()));
        assert_eq!(failure.kind(), FailureKind::Rule);
        assert_eq!(failure.message(), "wallet error");

        let failure = Failure::from(ChainError::Rpc("boom".into()));
        assert_eq!(failure.kind(), FailureKind::Upstream);
    }

    #[test]
    fn test_iso_timestamp() {
        assert_eq!(
            iso_timestamp(1_700_000_000).as_deref(),
            Some("2023-11-14T22:13:20.000Z")
        );
        assert_eq!(iso_timestamp(0).as_deref(), Some("1970-01-01T00:00:00.000Z"));
    }
}
