//! Durable repository implementations.
//!
//! # Repositories
//!
//! - [`PgResourceRepository`] - PostgreSQL storage via SQLx
//! - [`InMemoryResourceRepository`] - `DashMap` storage for development and tests

pub mod memory_resource_repository;
pub mod pg_resource_repository;

pub use memory_resource_repository::InMemoryResourceRepository;
pub use pg_resource_repository::PgResourceRepository;
