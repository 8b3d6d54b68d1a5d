//! Backing store abstraction for counters, bans and other keyed state.
//!
//! The admission path only needs four operations: atomic increment, TTL
//! assignment, point lookup and TTL upsert. They are expressed as a trait so
//! the engine can run against Redis in production and against an in-memory
//! store in tests or single-process deployments.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::AsyncCommands;
use thiserror::Error;
use tokio::sync::Mutex;

/// Errors that can occur while talking to the backing store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Keyed store used for window counters and ban records.
///
/// All operations are single-key and atomic; no cross-key transactions are
/// required anywhere in the engine.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AdmissionStore: Send + Sync {
    /// Atomically increment the integer value at `key`, returning the
    /// post-increment count. A missing key counts as zero.
    async fn increment(&self, key: &str) -> StoreResult<u64>;

    /// Set the remaining time to live for `key`.
    async fn expire(&self, key: &str, seconds: u64) -> StoreResult<()>;

    /// Fetch the value at `key`, or `None` if absent or expired.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Upsert `key` to `value` with a time to live.
    async fn set_with_ttl(&self, key: &str, value: &str, seconds: u64) -> StoreResult<()>;
}

/// Redis-backed store for distributed deployments
pub struct RedisStore {
    /// Redis connection manager, cloned per operation
    conn: redis::aio::ConnectionManager,
}

impl RedisStore {
    /// Connect to Redis at `url`
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let client = redis::Client::open(url).map_err(StoreError::from)?;
        let conn = redis::aio::ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl AdmissionStore for RedisStore {
    async fn increment(&self, key: &str) -> StoreResult<u64> {
        let mut conn = self.conn.clone();
        let count: u64 = conn.incr(key, 1).await?;
        Ok(count)
    }

    async fn expire(&self, key: &str, seconds: u64) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.expire(key, seconds as usize).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set_with_ttl(&self, key: &str, value: &str, seconds: u64) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(key, value, seconds as usize).await?;
        Ok(())
    }
}

struct MemoryEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl MemoryEntry {
    fn is_expired(&self) -> bool {
        self.expires_at.map_or(false, |at| Instant::now() >= at)
    }
}

/// In-memory store for single-process deployments and tests.
///
/// Mirrors the Redis semantics the engine relies on: increment treats the
/// value as an integer, keys vanish once their TTL elapses.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, MemoryEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AdmissionStore for MemoryStore {
    async fn increment(&self, key: &str) -> StoreResult<u64> {
        let mut entries = self.entries.lock().await;
        let current = match entries.get(key) {
            Some(entry) if !entry.is_expired() => entry.value.parse::<u64>().unwrap_or(0),
            _ => 0,
        };
        let next = current + 1;
        // A fresh counter starts without a TTL; the caller assigns one via expire()
        let expires_at = entries
            .get(key)
            .filter(|e| !e.is_expired())
            .and_then(|e| e.expires_at);
        entries.insert(
            key.to_string(),
            MemoryEntry {
                value: next.to_string(),
                expires_at,
            },
        );
        Ok(next)
    }

    async fn expire(&self, key: &str, seconds: u64) -> StoreResult<()> {
        let mut entries = self.entries.lock().await;
        if let Some(entry) = entries.get_mut(key) {
            entry.expires_at = Some(Instant::now() + Duration::from_secs(seconds));
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.is_expired() => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    async fn set_with_ttl(&self, key: &str, value: &str, seconds: u64) -> StoreResult<()> {
        let mut entries = self.entries.lock().await;
        entries.insert(
            key.to_string(),
            MemoryEntry {
                value: value.to_string(),
                expires_at: Some(Instant::now() + Duration::from_secs(seconds)),
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::sleep;

    #[tokio::test]
    async fn test_memory_store_increment() {
        let store = MemoryStore::new();

        assert_eq!(store.increment("rate:1.2.3.4:0").await.unwrap(), 1);
        assert_eq!(store.increment("rate:1.2.3.4:0").await.unwrap(), 2);
        assert_eq!(store.increment("rate:5.6.7.8:0").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_memory_store_get_and_set() {
        let store = MemoryStore::new();

        assert!(store.get("ban:1.2.3.4").await.unwrap().is_none());

        store.set_with_ttl("ban:1.2.3.4", "1", 60).await.unwrap();
        assert_eq!(
            store.get("ban:1.2.3.4").await.unwrap(),
            Some("1".to_string())
        );
    }

    #[tokio::test]
    async fn test_memory_store_expiry() {
        let store = MemoryStore::new();

        store.increment("rate:1.2.3.4:0").await.unwrap();
        store.expire("rate:1.2.3.4:0", 1).await.unwrap();
        assert!(store.get("rate:1.2.3.4:0").await.unwrap().is_some());

        sleep(Duration::from_millis(1100)).await;

        assert!(store.get("rate:1.2.3.4:0").await.unwrap().is_none());
        // A new increment after expiry restarts the count
        assert_eq!(store.increment("rate:1.2.3.4:0").await.unwrap(), 1);
    }
}
