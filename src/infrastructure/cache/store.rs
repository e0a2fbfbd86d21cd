//! Fast store trait and error types.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

/// Errors that can occur during fast store operations.
///
/// These never reach end users: every caller recovers locally (fail-open).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Fast store connection error: {0}")]
    Connection(String),

    #[error("Fast store operation error: {0}")]
    Operation(String),

    #[error("Fast store operation timed out after {0:?}")]
    Timeout(Duration),
}

/// Result type for fast store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Snapshot of fast store usage for the admin surface.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoreStats {
    pub backend: &'static str,
    pub total_keys: u64,
    pub used_memory_human: Option<String>,
    pub connected_clients: Option<u64>,
    pub uptime_in_seconds: Option<u64>,
    pub keyspace_hits: u64,
    pub keyspace_misses: u64,
    pub hit_rate: f64,
}

impl StoreStats {
    pub(crate) fn compute_hit_rate(hits: u64, misses: u64) -> f64 {
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

/// Low-latency key/value store with expiry and atomic counters.
///
/// Every method is one network round trip (or an atomic primitive of the
/// backend) and may fail or time out. Callers decide how to degrade.
///
/// # Implementations
///
/// - [`crate::infrastructure::cache::RedisStore`] - Redis-backed store
/// - [`crate::infrastructure::cache::MemoryStore`] - In-process store for development and tests
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FastStore: Send + Sync {
    /// Reads a value.
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Writes a value that expires after `ttl`.
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> StoreResult<()>;

    /// Removes a key. Returns whether it existed.
    async fn delete(&self, key: &str) -> StoreResult<bool>;

    /// Atomically adds `by` to an integer key (absent counts as 0) and
    /// returns the new value. The key does not expire.
    async fn increment(&self, key: &str, by: i64) -> StoreResult<i64>;

    /// Atomically increments an integer key and returns the new value.
    ///
    /// When the increment creates the key, it is given an expiry of `ttl`;
    /// later increments leave the expiry untouched.
    async fn increment_with_expiry(&self, key: &str, ttl: Duration) -> StoreResult<i64>;

    /// Atomically reads an integer key and removes it.
    ///
    /// Returns the previous value, or 0 if the key was absent. Two concurrent
    /// callers never both observe the same value.
    async fn take(&self, key: &str) -> StoreResult<i64>;

    /// Atomically subtracts `amount` from an integer key if it holds at
    /// least `amount`. Returns whether the amount was claimed.
    ///
    /// A key brought to exactly 0 is removed. Concurrent callers can never
    /// claim more than the key held.
    async fn claim(&self, key: &str, amount: i64) -> StoreResult<bool>;

    /// Lists keys starting with `prefix`.
    async fn keys_with_prefix(&self, prefix: &str) -> StoreResult<Vec<String>>;

    /// Removes every key starting with `prefix`. Returns how many were removed.
    async fn delete_prefix(&self, prefix: &str) -> StoreResult<u64>;

    /// Usage statistics.
    async fn stats(&self) -> StoreResult<StoreStats>;

    /// Checks if the backend is reachable.
    async fn health_check(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate() {
        assert_eq!(StoreStats::compute_hit_rate(0, 0), 0.0);
        assert_eq!(StoreStats::compute_hit_rate(3, 1), 0.75);
    }

    #[test]
    fn test_timeout_display() {
        let err = StoreError::Timeout(Duration::from_millis(250));
        assert!(err.to_string().contains("timed out"));
    }
}
