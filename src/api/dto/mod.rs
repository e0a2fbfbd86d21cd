//! Data Transfer Objects for API requests and responses.
//!
//! All DTOs use Serde for JSON serialization/deserialization and validator
//! for input validation. Sync reports and store statistics are serialized
//! directly from their service types.

pub mod admin;
pub mod health;
pub mod resource;
