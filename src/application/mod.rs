//! Application layer services implementing business logic.
//!
//! Services coordinate the durable repository, the fast store and the hit
//! pipeline. They consume trait objects and provide a clean API for HTTP
//! handlers and the admin CLI.
//!
//! # Available Services
//!
//! - [`services::resource_service::ResourceService`] - Creation, resolution and admin operations
//! - [`services::resolution_cache::ResolutionCache`] - Cache-aside lookup
//! - [`services::counter_aggregator::CounterAggregator`] - Batched hit counters
//! - [`services::rate_limiter::RateLimiter`] - Fixed-window admission per tier
//! - [`services::identifier_generator::IdentifierGenerator`] - Collision-checked codes

pub mod services;
