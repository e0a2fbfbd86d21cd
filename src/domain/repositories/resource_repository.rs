//! Repository trait for durable resource storage.

use crate::domain::entities::{HistoryPage, HistoryQuery, NewResource, Resource, ResourceKind};
use crate::error::AppError;
use async_trait::async_trait;

/// Durable source of truth for resources and their cumulative hit counters.
///
/// Every method is a single independent round trip; callers never hold a
/// process-local lock across one.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgResourceRepository`] - PostgreSQL implementation
/// - [`crate::infrastructure::persistence::InMemoryResourceRepository`] - In-process implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResourceRepository: Send + Sync {
    /// Finds a resource by kind and identifier.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Unavailable`] when the store cannot be reached.
    async fn get_resource(&self, kind: ResourceKind, code: &str)
    -> Result<Option<Resource>, AppError>;

    /// Persists a new resource with a zero hit counter.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::DuplicateId`] if the identifier is already taken
    /// within its kind.
    /// Returns [`AppError::Unavailable`] when the store cannot be reached.
    async fn create_resource(&self, new_resource: NewResource) -> Result<Resource, AppError>;

    /// Adds `delta` to the hit counter.
    ///
    /// The update is relative, so concurrent flushes for the same identifier
    /// compose instead of overwriting each other. Returns `false` if no
    /// resource matched.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Unavailable`] when the store cannot be reached.
    async fn increment_counter(
        &self,
        kind: ResourceKind,
        code: &str,
        delta: i64,
    ) -> Result<bool, AppError>;

    /// Checks whether an identifier is taken within its kind.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Unavailable`] when the store cannot be reached.
    async fn exists_id(&self, kind: ResourceKind, code: &str) -> Result<bool, AppError>;

    /// Lists one owner's resources of `kind`, one page at a time.
    ///
    /// Ties on the sort column are broken by insertion order in the same
    /// direction, so pages never overlap.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Unavailable`] when the store cannot be reached.
    async fn list_by_owner(
        &self,
        kind: ResourceKind,
        query: HistoryQuery,
    ) -> Result<HistoryPage, AppError>;

    /// Round trip used by the health check.
    async fn ping(&self) -> Result<(), AppError>;
}
