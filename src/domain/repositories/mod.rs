//! Repository trait definitions for the domain layer.
//!
//! Traits define the contract for durable data operations; implementations
//! live in `crate::infrastructure::persistence`. Mock implementations are
//! generated via `mockall` for unit tests.
//!
//! # Available Repositories
//!
//! - [`ResourceRepository`] - Resources and their cumulative hit counters

pub mod resource_repository;

pub use resource_repository::ResourceRepository;

#[cfg(test)]
pub use resource_repository::MockResourceRepository;
