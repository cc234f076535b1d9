//! In-process key-value store.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::replay::{KeyValueStore, ReplayError};

/// Expiring map shared by clones. Used when no Redis URL is configured and
/// in tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<DashMap<String, (String, Instant)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, ReplayError> {
        let now = Instant::now();
        let value = match self.inner.get(key) {
            Some(entry) if entry.1 > now => Some(entry.0.clone()),
            Some(_) => None,
            None => return Ok(None),
        };
        if value.is_none() {
            self.inner.remove_if(key, |_, (_, expires)| *expires <= now);
        }
        Ok(value)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), ReplayError> {
        let now = Instant::now();
        // every relay writes a fresh key, so expired ones are swept here
        self.inner.retain(|_, (_, expires)| *expires > now);
        self.inner.insert(key.to_string(), (value, now + ttl));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_then_get() {
        let store = MemoryStore::new();
        store.set("k", "v".into(), Duration::from_secs(60)).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
        assert_eq!(store.get("other").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expired_entries_vanish() {
        let store = MemoryStore::new();
        store.set("k", "v".into(), Duration::ZERO).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_set_sweeps_expired_entries() {
        let store = MemoryStore::new();
        for i in 0..100 {
            store.set(&format!("k{}", i), "v".into(), Duration::ZERO).await.unwrap();
        }
        store.set("live", "v".into(), Duration::from_secs(60)).await.unwrap();
        store.set("fresh", "v".into(), Duration::from_secs(60)).await.unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.get("live").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_clones_share_entries() {
        let store = MemoryStore::new();
        let clone = store.clone();
        clone.set("k", "v".into(), Duration::from_secs(60)).await.unwrap();
        assert_eq!(store.len(), 1);
    }
}
