//! Replay protection for relayed transactions.
//!
//! # Data Flow
//! ```text
//! relay request
//!     → ReplayBackend::open (per request: shared memory map or new Redis connection)
//!     → ReplayGuard::check (last relay of the same call too recent?)
//!     → ... transaction sent ...
//!     → ReplayGuard::record (store "now" with a TTL of the interval)
//! ```
//!
//! The check and the record are separate round trips, so two concurrent
//! identical requests can both pass. This throttles repeats; it is not a lock.

pub mod memory;
pub mod redis_store;

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use crate::error::Failure;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("Replay store error: {0}")]
    Redis(#[from] redis::RedisError),
}

impl From<ReplayError> for Failure {
    fn from(err: ReplayError) -> Self {
        Failure::upstream(err.to_string()).with_cause(err)
    }
}

/// Minimal key-value surface the guard needs.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, ReplayError>> + Send;

    /// Store `value`, expiring after `ttl`.
    fn set(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> impl Future<Output = Result<(), ReplayError>> + Send;
}

/// Where replay timestamps live.
#[derive(Debug, Clone)]
pub enum ReplayBackend {
    Memory(MemoryStore),
    Redis(redis::Client),
}

impl ReplayBackend {
    /// Redis when a URL is given, otherwise an in-process map.
    pub fn from_url(redis_url: Option<&str>) -> Result<Self, ReplayError> {
        match redis_url {
            Some(url) => Ok(ReplayBackend::Redis(redis::Client::open(url)?)),
            None => Ok(ReplayBackend::Memory(MemoryStore::new())),
        }
    }

    /// Open a store for one request.
    pub async fn open(&self) -> Result<ReplayStore, ReplayError> {
        match self {
            ReplayBackend::Memory(store) => Ok(ReplayStore::Memory(store.clone())),
            ReplayBackend::Redis(client) => Ok(ReplayStore::Redis(RedisStore::connect(client).await?)),
        }
    }
}

/// A store opened by [`ReplayBackend::open`].
#[derive(Debug, Clone)]
pub enum ReplayStore {
    Memory(MemoryStore),
    Redis(RedisStore),
}

impl KeyValueStore for ReplayStore {
    async fn get(&self, key: &str) -> Result<Option<String>, ReplayError> {
        match self {
            ReplayStore::Memory(store) => store.get(key).await,
            ReplayStore::Redis(store) => store.get(key).await,
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), ReplayError> {
        match self {
            ReplayStore::Memory(store) => store.set(key, value, ttl).await,
            ReplayStore::Redis(store) => store.set(key, value, ttl).await,
        }
    }
}

/// Key identifying one relayed call: `relay:<to>:<calldata hex>`.
pub fn replay_key(to: &str, calldata: &[u8]) -> String {
    format!(
        "relay:{}:{}",
        to.to_lowercase(),
        alloy::hex::encode_prefixed(calldata)
    )
}

/// Rejects a call seen less than `min_interval` ago.
#[derive(Debug, Clone)]
pub struct ReplayGuard<K> {
    store: K,
    min_interval: Duration,
}

impl<K: KeyValueStore> ReplayGuard<K> {
    pub fn new(store: K, min_interval: Duration) -> Self {
        Self { store, min_interval }
    }

    /// `Err(Rule)` when `key` was recorded less than the interval before `now_secs`.
    pub async fn check(&self, key: &str, now_secs: u64) -> Result<(), Failure> {
        let last = self.store.get(key).await?;
        let last = last.and_then(|v| v.parse::<u64>().ok());

        match last {
            Some(at) if now_secs.saturating_sub(at) < self.min_interval.as_secs() => {
                tracing::info!(key = %key, last = at, now = now_secs, "Relay throttled");
                Err(Failure::rule("re-execution interval not elapsed"))
            }
            _ => Ok(()),
        }
    }

    /// Remember that `key` ran at `now_secs`.
    pub async fn record(&self, key: &str, now_secs: u64) -> Result<(), Failure> {
        self.store
            .set(key, now_secs.to_string(), self.min_interval)
            .await?;
        Ok(())
    }
}
