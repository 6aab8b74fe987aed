//! In-memory KV store implementation using `DashMap`.
//!
//! Data is lost on process restart. Expired entries are dropped lazily on
//! read, or in bulk with [`MemoryKvStore::purge_expired`].

use super::KvStore;
use crate::Result;
use dashmap::DashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

/// In-memory key-value store with per-entry expiry.
///
/// Thread-safe and lock-free for readers; uses `DashMap` internally.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    store: DashMap<String, Entry>,
}

impl MemoryKvStore {
    /// Create a new in-memory KV store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: DashMap::new(),
        }
    }

    /// Number of stored entries, including expired ones not yet purged.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Check if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Remove every expired entry. Returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.store.len();
        self.store.retain(|_, entry| entry.is_live(now));
        before - self.store.len()
    }

    /// Remaining time-to-live for `key`, if it exists and has an expiry.
    #[must_use]
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        self.store
            .get(key)
            .and_then(|entry| entry.expires_at)
            .and_then(|at| at.checked_duration_since(now))
    }
}

impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let now = Instant::now();
        let hit = self.store.get(key).map(|e| (e.is_live(now), e.value.clone()));
        match hit {
            Some((true, value)) => Ok(Some(value)),
            Some((false, _)) => {
                self.store.remove_if(key, |_, e| !e.is_live(now));
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.store.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: None,
            },
        );
        Ok(())
    }

    async fn set_ex(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        self.store.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.store.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let now = Instant::now();
        Ok(self.store.get(key).is_some_and(|e| e.is_live(now)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_purge_expired() {
        let store = MemoryKvStore::new();
        store
            .set_ex("a", vec![1], Duration::from_millis(1))
            .await
            .unwrap();
        store.set("b", vec![2]).await.unwrap();
        std::thread::sleep(Duration::from_millis(5));

        assert_eq!(store.len(), 2);
        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_ttl_reported() {
        let store = MemoryKvStore::new();
        store
            .set_ex("a", vec![1], Duration::from_secs(3600))
            .await
            .unwrap();
        store.set("b", vec![2]).await.unwrap();

        let ttl = store.ttl("a").unwrap();
        assert!(ttl > Duration::from_secs(3500));
        assert!(store.ttl("b").is_none());
        assert!(store.ttl("missing").is_none());
    }

    #[test]
    fn test_memory_kv_default() {
        let store = MemoryKvStore::default();
        assert!(store.is_empty());
    }
}
