//! Configuration loading from disk and the environment.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Env { var: &'static str, reason: String },
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Env { var, reason } => write!(f, "Invalid {}: {}", var, reason),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load the file (or defaults), overlay the process environment and validate.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
            toml::from_str(&content).map_err(ConfigError::Parse)?
        }
        None => AppConfig::default(),
    };

    apply_env(&mut config, |name| std::env::var(name).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay environment variables onto `config`.
///
/// `lookup` abstracts `std::env::var` so the mapping can be exercised without
/// touching the process environment. Empty values count as unset.
pub fn apply_env<F>(config: &mut AppConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("API_KEY") {
        config.auth.api_key = Some(v);
    }
    if let Some(v) = get("AIRTABLE_BASE") {
        config.datastore.base = Some(v);
    }
    if let Some(v) = get("AIRTABLE_API_KEY") {
        config.datastore.api_key = Some(v);
    }
    if let Some(v) = get("RPC_URL") {
        config.chain.rpc_url = v;
    }
    if let Some(v) = get("STOKENS_ADDRESS") {
        config.chain.stokens_address = Some(v);
    }
    if let Some(v) = get("RPC_MAX_CONCURRENCY") {
        config.chain.rpc_max_concurrency = v.trim().parse().map_err(|e| ConfigError::Env {
            var: "RPC_MAX_CONCURRENCY",
            reason: format!("{}", e),
        })?;
    }
    if let Some(v) = get("WEBHOOK_TICKETS_KEY") {
        config.tickets.key = Some(v);
    }
    if let Some(v) = get("WEBHOOK_TICKETS_FIELDS") {
        config.tickets.fields = parse_column_map("WEBHOOK_TICKETS_FIELDS", &v)?;
    }
    if let Some(v) = get("PROPERTY_ADDRESS") {
        config.cron.property_address = Some(v);
    }
    if let Some(v) = get("CRON_STOKENS_TABLE") {
        config.cron.table = Some(v);
    }
    if let Some(v) = get("CRON_STOKENS_PRIMARY_KEY") {
        config.cron.primary_key = Some(v);
    }
    if let Some(v) = get("CRON_STOKENS_FIELDS") {
        config.cron.fields = parse_column_map("CRON_STOKENS_FIELDS", &v)?;
    }
    if let Some(v) = get("REDIS_URL") {
        config.relay.redis_url = Some(v);
    }
    if let Some(v) = get("MNEMONIC") {
        config.secrets.mnemonic = Some(v);
    }
    if let Some(v) = get("PRIVATE_KEY") {
        config.secrets.private_key = Some(v);
    }

    Ok(())
}

/// Parse a JSON object of role → column name. Non-string values are skipped.
fn parse_column_map(var: &'static str, raw: &str) -> Result<BTreeMap<String, String>, ConfigError> {
    let value: serde_json::Value = serde_json::from_str(raw).map_err(|e| ConfigError::Env {
        var,
        reason: format!("{}", e),
    })?;
    let object = value.as_object().ok_or_else(|| ConfigError::Env {
        var,
        reason: "expected a JSON object".to_string(),
    })?;

    Ok(object
        .iter()
        .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
        .collect())
}
