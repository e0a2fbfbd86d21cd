//! Redis-backed fast store.

use super::store::{FastStore, StoreError, StoreResult, StoreStats};
use async_trait::async_trait;
use redis::{AsyncCommands, Client, RedisError, Script, aio::ConnectionManager};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Increments a key and sets its expiry only when the increment created it.
const INCR_WITH_EXPIRY: &str = r#"
local current = redis.call('INCR', KEYS[1])
if current == 1 then
    redis.call('PEXPIRE', KEYS[1], ARGV[1])
end
return current
"#;

/// Subtracts ARGV[1] from a counter holding at least that much; a counter
/// brought to zero is deleted. Returns 1 when claimed, 0 otherwise.
const CLAIM_BATCH: &str = r#"
local current = tonumber(redis.call('GET', KEYS[1]) or '0')
local amount = tonumber(ARGV[1])
if current < amount then
    return 0
end
if current == amount then
    redis.call('DEL', KEYS[1])
else
    redis.call('DECRBY', KEYS[1], amount)
end
return 1
"#;

/// Multiplier on the per-op timeout for commands that move counter value
/// out of Redis (`take`, `claim`). Timing out after the server applied one
/// of them drops the claimed delta, so they get more room than plain reads.
const CLAIM_TIMEOUT_FACTOR: u32 = 4;

/// Keys fetched per SCAN round trip.
const SCAN_BATCH: usize = 500;

/// Bound for multi round-trip administrative operations (SCAN, bulk DEL).
const ADMIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Redis fast store.
///
/// Uses `ConnectionManager` for automatic reconnection. Every operation is
/// bounded by `op_timeout`; an elapsed timeout is reported as
/// [`StoreError::Timeout`] so callers can fail open instead of waiting.
/// Requires Redis 6.2+ for `GETDEL`.
pub struct RedisStore {
    client: ConnectionManager,
    op_timeout: Duration,
    incr_with_expiry: Arc<Script>,
    claim_batch: Arc<Script>,
}

impl RedisStore {
    /// Connects to Redis and validates the connection with a PING.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Connection`] if the URL is invalid, the
    /// connection cannot be established, or the PING fails.
    pub async fn connect(redis_url: &str, op_timeout: Duration) -> StoreResult<Self> {
        info!("Connecting to Redis");

        let client = Client::open(redis_url)
            .map_err(|e| StoreError::Connection(format!("Failed to create Redis client: {e}")))?;

        let manager = ConnectionManager::new(client)
            .await
            .map_err(|e| StoreError::Connection(format!("Failed to connect to Redis: {e}")))?;

        let mut test_conn = manager.clone();
        test_conn
            .ping::<()>()
            .await
            .map_err(|e| StoreError::Connection(format!("Redis PING failed: {e}")))?;

        info!("✓ Connected to Redis");

        Ok(Self {
            client: manager,
            op_timeout,
            incr_with_expiry: Arc::new(Script::new(INCR_WITH_EXPIRY)),
            claim_batch: Arc::new(Script::new(CLAIM_BATCH)),
        })
    }

    fn claim_timeout(&self) -> Duration {
        claim_timeout_for(self.op_timeout)
    }

    async fn bounded<T, F>(&self, op: &'static str, timeout: Duration, fut: F) -> StoreResult<T>
    where
        F: Future<Output = Result<T, RedisError>>,
    {
        match tokio::time::timeout(timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                warn!(op, error = %e, "Redis operation failed");
                Err(map_redis_error(op, e, timeout))
            }
            Err(_) => {
                warn!(op, timeout_ms = timeout.as_millis() as u64, "Redis operation timed out");
                Err(StoreError::Timeout(timeout))
            }
        }
    }

    async fn scan_prefix(mut conn: ConnectionManager, prefix: &str) -> Result<Vec<String>, RedisError> {
        let pattern = format!("{}*", escape_glob(prefix));
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;

            keys.extend(batch);

            if next == 0 {
                break;
            }
            cursor = next;
        }

        Ok(keys)
    }
}

fn map_redis_error(op: &str, err: RedisError, timeout: Duration) -> StoreError {
    if err.is_timeout() {
        StoreError::Timeout(timeout)
    } else if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() {
        StoreError::Connection(format!("{op}: {err}"))
    } else {
        StoreError::Operation(format!("{op}: {err}"))
    }
}

/// Escapes glob metacharacters so a prefix matches literally in SCAN MATCH.
fn escape_glob(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len());
    for c in prefix.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Extracts a `field:value` line from an `INFO` reply.
fn info_field<'a>(info: &'a str, field: &str) -> Option<&'a str> {
    info.lines().find_map(|line| {
        line.strip_prefix(field)
            .and_then(|rest| rest.strip_prefix(':'))
            .map(str::trim)
    })
}

#[async_trait]
impl FastStore for RedisStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let mut conn = self.client.clone();
        let value = self
            .bounded("GET", self.op_timeout, async move {
                conn.get::<_, Option<Vec<u8>>>(key).await
            })
            .await?;

        debug!(key, hit = value.is_some(), "Redis GET");
        Ok(value)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> StoreResult<()> {
        let mut conn = self.client.clone();
        let ttl_seconds = ttl.as_secs().max(1);

        self.bounded("SET", self.op_timeout, async move {
            conn.set_ex::<_, _, ()>(key, value, ttl_seconds).await
        })
        .await?;

        debug!(key, ttl_seconds, "Redis SET");
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        let mut conn = self.client.clone();
        let deleted = self
            .bounded("DEL", self.op_timeout, async move {
                conn.del::<_, i64>(key).await
            })
            .await?;

        Ok(deleted > 0)
    }

    async fn increment(&self, key: &str, by: i64) -> StoreResult<i64> {
        let mut conn = self.client.clone();
        self.bounded("INCRBY", self.op_timeout, async move {
            conn.incr::<_, _, i64>(key, by).await
        })
        .await
    }

    async fn increment_with_expiry(&self, key: &str, ttl: Duration) -> StoreResult<i64> {
        let mut conn = self.client.clone();
        let script = self.incr_with_expiry.clone();
        let ttl_ms = ttl.as_millis().max(1) as u64;

        self.bounded("INCR_WITH_EXPIRY", self.op_timeout, async move {
            let value: i64 = script.key(key).arg(ttl_ms).invoke_async(&mut conn).await?;
            Ok(value)
        })
        .await
    }

    async fn take(&self, key: &str) -> StoreResult<i64> {
        let mut conn = self.client.clone();
        let previous = self
            .bounded("GETDEL", self.claim_timeout(), async move {
                let value: Option<i64> = redis::cmd("GETDEL").arg(key).query_async(&mut conn).await?;
                Ok(value)
            })
            .await?;

        Ok(previous.unwrap_or(0))
    }

    async fn claim(&self, key: &str, amount: i64) -> StoreResult<bool> {
        let mut conn = self.client.clone();
        let script = self.claim_batch.clone();

        let claimed = self
            .bounded("CLAIM", self.claim_timeout(), async move {
                let claimed: i64 = script.key(key).arg(amount).invoke_async(&mut conn).await?;
                Ok(claimed)
            })
            .await?;

        Ok(claimed == 1)
    }

    async fn keys_with_prefix(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let conn = self.client.clone();
        self.bounded("SCAN", ADMIN_TIMEOUT, Self::scan_prefix(conn, prefix))
            .await
    }

    async fn delete_prefix(&self, prefix: &str) -> StoreResult<u64> {
        let keys = self.keys_with_prefix(prefix).await?;
        if keys.is_empty() {
            return Ok(0);
        }

        let mut removed = 0;
        for chunk in keys.chunks(SCAN_BATCH) {
            let mut conn = self.client.clone();
            removed += self
                .bounded("DEL", ADMIN_TIMEOUT, async move {
                    conn.del::<_, u64>(chunk).await
                })
                .await?;
        }

        info!(prefix, removed, "Cleared fast store keys");
        Ok(removed)
    }

    async fn stats(&self) -> StoreResult<StoreStats> {
        let mut conn = self.client.clone();
        let (info, total_keys) = self
            .bounded("INFO", ADMIN_TIMEOUT, async move {
                let info: String = redis::cmd("INFO").query_async(&mut conn).await?;
                let total_keys: u64 = redis::cmd("DBSIZE").query_async(&mut conn).await?;
                Ok((info, total_keys))
            })
            .await?;

        let parse_u64 = |field: &str| info_field(&info, field).and_then(|v| v.parse::<u64>().ok());
        let keyspace_hits = parse_u64("keyspace_hits").unwrap_or(0);
        let keyspace_misses = parse_u64("keyspace_misses").unwrap_or(0);

        Ok(StoreStats {
            backend: "redis",
            total_keys,
            used_memory_human: info_field(&info, "used_memory_human").map(str::to_string),
            connected_clients: parse_u64("connected_clients"),
            uptime_in_seconds: parse_u64("uptime_in_seconds"),
            keyspace_hits,
            keyspace_misses,
            hit_rate: StoreStats::compute_hit_rate(keyspace_hits, keyspace_misses),
        })
    }

    async fn health_check(&self) -> bool {
        let mut conn = self.client.clone();
        self.bounded("PING", self.op_timeout, async move { conn.ping::<()>().await })
            .await
            .is_ok()
    }
}

fn claim_timeout_for(op_timeout: Duration) -> Duration {
    op_timeout * CLAIM_TIMEOUT_FACTOR
}
