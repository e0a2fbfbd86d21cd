//! Fast key/value store used for caching, hit counters and rate windows.
//!
//! Provides a [`FastStore`] trait with two implementations:
//! - [`RedisStore`] - Production Redis-backed store
//! - [`MemoryStore`] - In-process store for development and tests

mod memory_store;
mod redis_store;
mod store;

pub use memory_store::MemoryStore;
pub use redis_store::RedisStore;
pub use store::{FastStore, StoreError, StoreResult, StoreStats};

#[cfg(test)]
pub use store::MockFastStore;
