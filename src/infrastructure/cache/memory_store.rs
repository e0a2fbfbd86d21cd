//! In-process fast store.

use super::store::{FastStore, StoreError, StoreResult, StoreStats};
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry as MapEntry;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    expire_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self) -> bool {
        self.expire_at.is_some_and(|at| Instant::now() >= at)
    }

    fn as_integer(&self, key: &str) -> StoreResult<i64> {
        std::str::from_utf8(&self.value)
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or_else(|| {
                StoreError::Operation(format!("value at {key} is not an integer"))
            })
    }
}

/// In-memory fast store backed by `DashMap`.
///
/// Mirrors the atomic semantics of [`super::RedisStore`]: every
/// read-modify-write happens under the entry's shard lock, so `increment`, `claim`
/// and `take` are atomic with respect to each other. Expiry is evaluated lazily on
/// access and uses the tokio clock, so paused-time tests can advance it.
///
/// Used when no `REDIS_URL` is configured and throughout the test suite.
#[derive(Debug, Default)]
pub struct MemoryStore {
    storage: DashMap<String, Entry>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn live(&self, key: &str) -> Option<Entry> {
        let entry = self.storage.get(key)?;
        if entry.is_expired() {
            drop(entry);
            self.storage.remove_if(key, |_, e| e.is_expired());
            return None;
        }
        Some(entry.clone())
    }

    fn add(&self, key: &str, by: i64, ttl_on_create: Option<Duration>) -> StoreResult<i64> {
        match self.storage.entry(key.to_string()) {
            MapEntry::Occupied(mut occupied) if !occupied.get().is_expired() => {
                let current = occupied.get().as_integer(key)?;
                let next = current + by;
                occupied.get_mut().value = next.to_string().into_bytes();
                Ok(next)
            }
            MapEntry::Occupied(mut occupied) => {
                occupied.insert(Entry {
                    value: by.to_string().into_bytes(),
                    expire_at: ttl_on_create.map(|ttl| Instant::now() + ttl),
                });
                Ok(by)
            }
            MapEntry::Vacant(vacant) => {
                vacant.insert(Entry {
                    value: by.to_string().into_bytes(),
                    expire_at: ttl_on_create.map(|ttl| Instant::now() + ttl),
                });
                Ok(by)
            }
        }
    }
}

#[async_trait]
impl FastStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        match self.live(key) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(entry.value))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> StoreResult<()> {
        self.storage.insert(
            key.to_string(),
            Entry {
                value: value.to_vec(),
                expire_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        Ok(self
            .storage
            .remove(key)
            .is_some_and(|(_, entry)| !entry.is_expired()))
    }

    async fn increment(&self, key: &str, by: i64) -> StoreResult<i64> {
        self.add(key, by, None)
    }

    async fn increment_with_expiry(&self, key: &str, ttl: Duration) -> StoreResult<i64> {
        self.add(key, 1, Some(ttl))
    }

    async fn take(&self, key: &str) -> StoreResult<i64> {
        match self.storage.remove(key) {
            Some((_, entry)) if !entry.is_expired() => entry.as_integer(key),
            _ => Ok(0),
        }
    }

    async fn claim(&self, key: &str, amount: i64) -> StoreResult<bool> {
        match self.storage.entry(key.to_string()) {
            MapEntry::Occupied(mut occupied) if !occupied.get().is_expired() => {
                let current = occupied.get().as_integer(key)?;
                if current < amount {
                    return Ok(false);
                }
                if current == amount {
                    occupied.remove();
                } else {
                    occupied.get_mut().value = (current - amount).to_string().into_bytes();
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn keys_with_prefix(&self, prefix: &str) -> StoreResult<Vec<String>> {
        Ok(self
            .storage
            .iter()
            .filter(|e| e.key().starts_with(prefix) && !e.value().is_expired())
            .map(|e| e.key().clone())
            .collect())
    }

    async fn delete_prefix(&self, prefix: &str) -> StoreResult<u64> {
        let keys = self.keys_with_prefix(prefix).await?;
        let removed = keys
            .iter()
            .filter(|key| self.storage.remove(key.as_str()).is_some())
            .count();
        Ok(removed as u64)
    }

    async fn stats(&self) -> StoreResult<StoreStats> {
        let keyspace_hits = self.hits.load(Ordering::Relaxed);
        let keyspace_misses = self.misses.load(Ordering::Relaxed);
        let total_keys = self
            .storage
            .iter()
            .filter(|e| !e.value().is_expired())
            .count() as u64;

        Ok(StoreStats {
            backend: "memory",
            total_keys,
            keyspace_hits,
            keyspace_misses,
            hit_rate: StoreStats::compute_hit_rate(keyspace_hits, keyspace_misses),
            ..StoreStats::default()
        })
    }

    async fn health_check(&self) -> bool {
        true
    }
}
