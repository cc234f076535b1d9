//! Failure values carried through every request pipeline.
//!
//! A [`Failure`] is the error half of the pipeline `Result`. It is produced at
//! the point of detection, passed along untouched by the combinators in
//! [`crate::pipeline`], and mapped to an HTTP response only at the endpoint's
//! terminal step.

use std::sync::Arc;

use thiserror::Error;

/// Classification used to pick the HTTP status and the metric label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Missing or malformed request parameter, or missing configuration.
    Validation,
    /// The datastore or the chain RPC failed or answered with an unexpected shape.
    Upstream,
    /// A lookup produced no result.
    NotFound,
    /// A business rule rejected the request.
    Rule,
    /// Bearer token mismatch.
    Unauthorized,
}

impl FailureKind {
    /// Stable label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Validation => "validation",
            FailureKind::Upstream => "upstream",
            FailureKind::NotFound => "not_found",
            FailureKind::Rule => "rule",
            FailureKind::Unauthorized => "unauthorized",
        }
    }
}

type Cause = Arc<dyn std::error::Error + Send + Sync>;

/// A failed pipeline step.
///
/// Cloning is cheap: the optional cause is reference counted, so the same
/// failure can be handed to several downstream combinators.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct Failure {
    kind: FailureKind,
    message: String,
    #[source]
    cause: Option<Cause>,
}

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Validation, message)
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Upstream, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(FailureKind::NotFound, message)
    }

    pub fn rule(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Rule, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(FailureKind::Unauthorized, "authentication failed")
    }

    /// Attach the underlying error.
    pub fn with_cause<E>(mut self, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.cause = Some(Arc::new(cause));
        self
    }

    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Text of the wrapped cause, if any.
    pub fn cause_text(&self) -> Option<String> {
        self.cause.as_ref().map(|c| c.to_string())
    }
}

impl PartialEq for Failure {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.message == other.message
    }
}

impl From<serde_json::Error> for Failure {
    fn from(err: serde_json::Error) -> Self {
        Failure::validation(format!("Malformed JSON: {}", err)).with_cause(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_set_kind() {
        assert_eq!(Failure::validation("x").kind(), FailureKind::Validation);
        assert_eq!(Failure::upstream("x").kind(), FailureKind::Upstream);
        assert_eq!(Failure::not_found("x").kind(), FailureKind::NotFound);
        assert_eq!(Failure::rule("x").kind(), FailureKind::Rule);
        assert_eq!(Failure::unauthorized().message(), "authentication failed");
    }

    #[test]
    fn test_cause_is_kept_and_shared_by_clones() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "socket closed");
        let failure = Failure::upstream("rpc down").with_cause(io);
        let copy = failure.clone();

        assert_eq!(copy.to_string(), "rpc down");
        assert_eq!(copy.cause_text().as_deref(), Some("socket closed"));
        assert!(std::error::Error::source(&copy).is_some());
    }

    #[test]
    fn test_json_error_becomes_validation() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let failure = Failure::from(err);
        assert_eq!(failure.kind(), FailureKind::Validation);
        assert!(failure.message().starts_with("Malformed JSON"));
    }
}
