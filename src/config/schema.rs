//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.
//! Secrets never come from the file; see [`Secrets`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request hardening.
    pub security: SecurityConfig,

    /// Bearer token for protected endpoints.
    pub auth: AuthConfig,

    /// Spreadsheet datastore connection.
    pub datastore: DatastoreConfig,

    /// Chain RPC settings.
    pub chain: ChainConfig,

    /// Ticket webhook settings.
    pub tickets: TicketsConfig,

    /// Scheduled sTokens sync settings.
    pub cron: CronConfig,

    /// Transaction relay settings.
    pub relay: RelayConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Wallet secrets, only ever read from the environment.
    #[serde(skip)]
    pub secrets: Secrets,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total time allowed for one request, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        // Event backfills walk many blocks; give them the same five minutes
        // a serverless function gets.
        Self { request_secs: 300 }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 1024 * 1024, // 1MB
        }
    }
}

#[derive(Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AuthConfig {
    /// Expected `Authorization: Bearer` token. When unset every protected
    /// request is rejected.
    pub api_key: Option<String>,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatastoreConfig {
    /// REST root, without the base id.
    pub api_url: String,

    /// Base id (e.g. `appXXXXXXXXXXXXXX`).
    pub base: Option<String>,

    /// Personal access token.
    pub api_key: Option<String>,

    /// Per-call HTTP timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for DatastoreConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.airtable.com/v0".to_string(),
            base: None,
            api_key: None,
            timeout_secs: 30,
        }
    }
}

impl fmt::Debug for DatastoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatastoreConfig")
            .field("api_url", &self.api_url)
            .field("base", &self.base)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Chain RPC configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChainConfig {
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Failover JSON-RPC endpoint URLs.
    pub failover_urls: Vec<String>,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// sTokens contract address on this chain.
    pub stokens_address: Option<String>,

    /// Maximum in-flight RPC calls per request fan-out.
    pub rpc_max_concurrency: usize,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://polygon-rpc.com".to_string(),
            failover_urls: vec!["https://polygon-bor-rpc.publicnode.com".to_string()],
            rpc_timeout_secs: 10,
            stokens_address: None,
            rpc_max_concurrency: 5,
        }
    }
}

#[derive(Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TicketsConfig {
    /// Path key the ticket webhook must be called with.
    pub key: Option<String>,

    /// Ticket attribute (`status`, `id`, `account`, `benefit_id`,
    /// `benefit_description`) to column name.
    pub fields: BTreeMap<String, String>,
}

impl fmt::Debug for TicketsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TicketsConfig")
            .field("key", &self.key.as_ref().map(|_| "<redacted>"))
            .field("fields", &self.fields)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CronConfig {
    /// Property whose sTokens are mirrored.
    pub property_address: Option<String>,

    /// Destination table.
    pub table: Option<String>,

    /// Column used to match existing rows.
    pub primary_key: Option<String>,

    /// Column role to column name.
    pub fields: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Chain id (as a string key) to swap-and-stake agent address.
    pub swap_contracts: BTreeMap<String, String>,

    /// Minimum seconds between two relays of the same call.
    pub min_interval_secs: u64,

    /// Redis URL for the replay guard; in-memory when unset.
    pub redis_url: Option<String>,

    /// RPC timeout for relayed transactions, in seconds.
    pub rpc_timeout_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            swap_contracts: BTreeMap::new(),
            min_interval_secs: 60,
            redis_url: None,
            rpc_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_filter: String,

    /// Emit JSON log lines instead of the human format.
    pub json_logs: bool,

    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Prometheus exporter bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: "onchain_sync=debug,tower_http=debug".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Wallet key material for the relay.
#[derive(Clone, Default)]
pub struct Secrets {
    /// BIP-39 phrase (`MNEMONIC`).
    pub mnemonic: Option<String>,
    /// Hex private key (`PRIVATE_KEY`); wins over the phrase when both are set.
    pub private_key: Option<String>,
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secrets")
            .field("mnemonic", &self.mnemonic.as_ref().map(|_| "<redacted>"))
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
