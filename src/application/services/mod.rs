//! Business logic services for the application layer.

pub mod counter_aggregator;
pub mod identifier_generator;
pub mod rate_limiter;
pub mod resolution_cache;
pub mod resource_service;

pub use counter_aggregator::{CounterAggregator, FlushOutcome, SyncReport};
pub use identifier_generator::IdentifierGenerator;
pub use rate_limiter::{
    Admission, Clock, ManualClock, RateLimitPolicy, RateLimiter, RateTier, SystemClock,
};
pub use resolution_cache::ResolutionCache;
pub use resource_service::{Access, ResourceService, ServiceSettings};
