//! Fixed-window rate limiting backed by the fast store.

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::infrastructure::cache::FastStore;

pub const DEFAULT_CREATE_LIMIT: u32 = 10;
pub const DEFAULT_INFO_LIMIT: u32 = 60;
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Source of wall-clock time for window arithmetic.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += chrono::Duration::from_std(by).unwrap_or_else(|_| chrono::Duration::zero());
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Endpoint class a request is admitted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateTier {
    /// Resource creation.
    Create,
    /// Info and image lookups.
    Info,
    /// Redirects and scans. Never limited.
    Redirect,
}

impl RateTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateTier::Create => "create",
            RateTier::Info => "info",
            RateTier::Redirect => "redirect",
        }
    }
}

impl fmt::Display for RateTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-tier request budgets sharing one window length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub create_limit: u32,
    pub info_limit: u32,
    pub window: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            create_limit: DEFAULT_CREATE_LIMIT,
            info_limit: DEFAULT_INFO_LIMIT,
            window: DEFAULT_WINDOW,
        }
    }
}

impl RateLimitPolicy {
    fn limit(&self, tier: RateTier) -> Option<u32> {
        match tier {
            RateTier::Create => Some(self.create_limit),
            RateTier::Info => Some(self.info_limit),
            RateTier::Redirect => None,
        }
    }
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// `remaining` is `None` when the tier is unlimited or the count could
    /// not be read.
    Allowed { remaining: Option<u32> },
    Rejected { retry_after: Duration },
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admission::Allowed { .. })
    }
}

/// Fixed-window limiter keyed by `(tier, identity, window start)`.
///
/// Each window is one fast store counter that expires with the window, so
/// nothing has to be cleaned up and a lost counter only ever admits more.
/// Fast store failures admit the request.
pub struct RateLimiter {
    store: Arc<dyn FastStore>,
    clock: Arc<dyn Clock>,
    policy: RateLimitPolicy,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn FastStore>, clock: Arc<dyn Clock>, policy: RateLimitPolicy) -> Self {
        Self {
            store,
            clock,
            policy,
        }
    }

    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    pub async fn admit(&self, identity: &str, tier: RateTier) -> Admission {
        let Some(limit) = self.policy.limit(tier) else {
            return Admission::Allowed { remaining: None };
        };

        let window_ms = (self.policy.window.as_millis() as i64).max(1);
        let now_ms = self.clock.now().timestamp_millis();
        let window_start = now_ms - now_ms.rem_euclid(window_ms);
        let key = format!("ratelimit:{tier}:{identity}:{}", window_start / 1000);

        let count = match self
            .store
            .increment_with_expiry(&key, self.policy.window)
            .await
        {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(%tier, identity, error = %e, "Rate limiter unavailable, admitting");
                return Admission::Allowed { remaining: None };
            }
        };

        if count > i64::from(limit) {
            let remaining_ms = (window_start + window_ms - now_ms).max(0) as u64;
            let retry_after = Duration::from_secs(remaining_ms.div_ceil(1000).max(1));

            tracing::info!(%tier, identity, count, limit, "Rate limit exceeded");
            metrics::counter!("rate_limit_rejections_total", "tier" => tier.as_str()).increment(1);

            return Admission::Rejected { retry_after };
        }

        Admission::Allowed {
            remaining: Some(limit - count as u32),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::cache::{MemoryStore, MockFastStore, StoreError};
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn limiter(clock: ManualClock) -> RateLimiter {
        RateLimiter::new(
            Arc::new(MemoryStore::new()),
            Arc::new(clock),
            RateLimitPolicy::default(),
        )
    }

    #[tokio::test]
    async fn test_admits_exactly_limit_then_rejects() {
        let clock = ManualClock::new(start());
        let limiter = limiter(clock.clone());

        for i in 0..10 {
            let admission = limiter.admit("10.0.0.1", RateTier::Create).await;
            assert_eq!(
                admission,
                Admission::Allowed {
                    remaining: Some(9 - i)
                }
            );
        }

        clock.advance(Duration::from_secs(15));
        match limiter.admit("10.0.0.1", RateTier::Create).await {
            Admission::Rejected { retry_after } => {
                assert_eq!(retry_after, Duration::from_secs(45));
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_window_rollover_resets() {
        let clock = ManualClock::new(start());
        let limiter = limiter(clock.clone());

        for _ in 0..11 {
            limiter.admit("10.0.0.1", RateTier::Create).await;
        }
        assert!(!limiter.admit("10.0.0.1", RateTier::Create).await.is_allowed());

        clock.advance(Duration::from_secs(60));
        assert!(limiter.admit("10.0.0.1", RateTier::Create).await.is_allowed());
    }

    #[tokio::test]
    async fn test_identities_and_tiers_are_independent() {
        let limiter = limiter(ManualClock::new(start()));

        for _ in 0..10 {
            limiter.admit("10.0.0.1", RateTier::Create).await;
        }

        assert!(!limiter.admit("10.0.0.1", RateTier::Create).await.is_allowed());
        assert!(limiter.admit("10.0.0.2", RateTier::Create).await.is_allowed());
        assert!(limiter.admit("10.0.0.1", RateTier::Info).await.is_allowed());
    }

    #[tokio::test]
    async fn test_retry_after_is_at_least_one_second() {
        let clock = ManualClock::new(start());
        let limiter = limiter(clock.clone());

        clock.advance(Duration::from_millis(59_900));
        for _ in 0..10 {
            limiter.admit("ip", RateTier::Create).await;
        }

        assert_eq!(
            limiter.admit("ip", RateTier::Create).await,
            Admission::Rejected {
                retry_after: Duration::from_secs(1)
            }
        );
    }

    #[tokio::test]
    async fn test_redirect_tier_never_touches_store() {
        let mut store = MockFastStore::new();
        store.expect_increment_with_expiry().never();

        let limiter = RateLimiter::new(
            Arc::new(store),
            Arc::new(SystemClock),
            RateLimitPolicy::default(),
        );

        for _ in 0..100 {
            assert!(limiter.admit("ip", RateTier::Redirect).await.is_allowed());
        }
    }

    #[tokio::test]
    async fn test_store_failure_admits() {
        let mut store = MockFastStore::new();
        store
            .expect_increment_with_expiry()
            .returning(|_, _| Err(StoreError::Timeout(Duration::from_millis(250))));

        let limiter = RateLimiter::new(
            Arc::new(store),
            Arc::new(SystemClock),
            RateLimitPolicy {
                create_limit: 0,
                ..RateLimitPolicy::default()
            },
        );

        assert_eq!(
            limiter.admit("ip", RateTier::Create).await,
            Admission::Allowed { remaining: None }
        );
    }
}
