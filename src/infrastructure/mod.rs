//! Infrastructure layer for external integrations.
//!
//! This layer implements interfaces defined by the domain layer, providing
//! concrete implementations for data persistence, the fast store and outbound
//! HTTP.
//!
//! # Modules
//!
//! - [`cache`] - Fast store abstraction (Redis and in-memory implementations)
//! - [`persistence`] - Durable resource repositories
//! - [`title_fetcher`] - Page title lookup for new resources

pub mod cache;
pub mod persistence;
pub mod title_fetcher;
