//! Core domain entities representing the business data model.
//!
//! - [`Resource`] - A persisted short link, QR code or barcode
//! - [`NewResource`] - Input for creating a resource
//! - [`ResourceView`] - Resolution projection shared by cache entries and responses
//! - [`ResourceKind`] - The three resource namespaces and their per-kind behaviour
//! - [`Representation`] - What a resolved resource renders to
//! - [`HistoryQuery`] - Paging and ordering for per-owner listings

pub mod history;
pub mod representation;
pub mod resource;

pub use history::{HistoryPage, HistoryQuery, HistorySort, SortOrder};
pub use representation::{Representation, Symbology};
pub use resource::{NewResource, Resource, ResourceKind, ResourceView, UnknownKind};
