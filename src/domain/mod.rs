//! Domain layer containing business entities and logic.
//!
//! Defines resources, the repository contract for durable storage and the
//! hit event pipeline, independent of infrastructure concerns.
//!
//! # Architecture
//!
//! - [`entities`] - Resources, kinds and their rendered representations
//! - [`repositories`] - Durable storage trait definitions
//! - [`hit_event`] - Hit event model
//! - [`hit_worker`] - Asynchronous hit processing worker
//!
//! # Hit Processing Flow
//!
//! 1. A redirect, scan or (optionally) info read resolves a resource
//! 2. [`hit_event::HitEvent`] is queued on the [`hit_worker::HitDispatcher`]
//! 3. [`hit_worker::run_hit_worker`] hands it to a [`hit_worker::HitRecorder`]
//! 4. The recorder batches it in the fast store and flushes durably

pub mod entities;
pub mod hit_event;
pub mod hit_worker;
pub mod repositories;
