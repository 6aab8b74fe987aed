//! Key-value cache used by the agent shells.
//!
//! Experiments and predictions are cached as JSON blobs with a time-to-live,
//! the same way a Redis `SETEX` would hold them. The trait is the seam: the
//! shells take any `KvStore` through their constructors, and tests use the
//! in-memory backend.
//!
//! # Example
//!
//! ```rust,no_run
//! use engagement_lab::kv::{KvStore, MemoryKvStore};
//! use std::time::Duration;
//!
//! # async fn example() -> engagement_lab::Result<()> {
//! let store = MemoryKvStore::new();
//!
//! store.set_ex("experiment:abc", b"{}".to_vec(), Duration::from_secs(60)).await?;
//! assert!(store.exists("experiment:abc").await?);
//!
//! store.delete("experiment:abc").await?;
//! assert!(!store.exists("experiment:abc").await?);
//! # Ok(())
//! # }
//! ```

mod memory;

pub use memory::MemoryKvStore;

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;

/// Key-value store trait for the agent cache.
pub trait KvStore: Send + Sync {
    /// Get a value by key.
    ///
    /// Returns `None` if the key doesn't exist or has expired.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Vec<u8>>>> + Send;

    /// Set a value for a key with no expiry.
    ///
    /// Overwrites any existing value.
    fn set(&self, key: &str, value: Vec<u8>) -> impl Future<Output = Result<()>> + Send;

    /// Set a value that expires after `ttl`.
    fn set_ex(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Delete a key.
    ///
    /// No-op if the key doesn't exist.
    fn delete(&self, key: &str) -> impl Future<Output = Result<()>> + Send;

    /// Check if a live key exists.
    fn exists(&self, key: &str) -> impl Future<Output = Result<bool>> + Send;
}

/// Serialize `value` as JSON and store it under `key` for `ttl`.
pub async fn put_json<S, T>(store: &S, key: &str, value: &T, ttl: Duration) -> Result<()>
where
    S: KvStore + ?Sized,
    T: Serialize + Sync,
{
    let bytes = serde_json::to_vec(value)?;
    store.set_ex(key, bytes, ttl).await
}

/// Load and decode a JSON value stored under `key`.
///
/// # Errors
///
/// Returns [`Error::Cache`] naming the key if the stored bytes do not decode.
pub async fn get_json<S, T>(store: &S, key: &str) -> Result<Option<T>>
where
    S: KvStore + ?Sized,
    T: DeserializeOwned,
{
    match store.get(key).await? {
        Some(bytes) => serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| Error::Cache(format!("corrupt entry at {key}: {e}"))),
        None => Ok(None),
    }
}
