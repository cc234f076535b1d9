//! Configuration validation.
//!
//! Serde handles syntax; this checks values. All problems are reported at
//! once rather than stopping at the first.

use std::net::SocketAddr;

use alloy::primitives::Address;

use crate::config::schema::AppConfig;

/// One semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }
    if config.chain.rpc_timeout_secs == 0 {
        errors.push(ValidationError::new("chain.rpc_timeout_secs", "must be greater than 0"));
    }
    if config.chain.rpc_max_concurrency == 0 {
        errors.push(ValidationError::new("chain.rpc_max_concurrency", "must be greater than 0"));
    }

    if url::Url::parse(&config.chain.rpc_url).is_err() {
        errors.push(ValidationError::new(
            "chain.rpc_url",
            format!("'{}' is not a URL", config.chain.rpc_url),
        ));
    }
    for (i, failover) in config.chain.failover_urls.iter().enumerate() {
        if url::Url::parse(failover).is_err() {
            errors.push(ValidationError::new(
                format!("chain.failover_urls[{}]", i),
                format!("'{}' is not a URL", failover),
            ));
        }
    }
    if url::Url::parse(&config.datastore.api_url).is_err() {
        errors.push(ValidationError::new("datastore.api_url", "not a URL"));
    }

    check_address(&mut errors, "chain.stokens_address", config.chain.stokens_address.as_deref());
    check_address(&mut errors, "cron.property_address", config.cron.property_address.as_deref());

    for (chain_id, address) in &config.relay.swap_contracts {
        let field = format!("relay.swap_contracts.{}", chain_id);
        if chain_id.parse::<u64>().is_err() {
            errors.push(ValidationError::new(field.clone(), "key must be a numeric chain id"));
        }
        check_address(&mut errors, &field, Some(address));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &str, value: Option<&str>) {
    if let Some(v) = value {
        if v.parse::<Address>().is_err() {
            errors.push(ValidationError::new(field, format!("'{}' is not an address", v)));
        }
    }
}
