//! In-process implementation of the resource repository.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::json;
use std::sync::atomic::{AtomicI64, Ordering};

use crate::domain::entities::{
    HistoryPage, HistoryQuery, HistorySort, NewResource, Resource, ResourceKind, SortOrder,
};
use crate::domain::repositories::ResourceRepository;
use crate::error::AppError;

/// Resource repository kept in a `DashMap`.
///
/// Sharded locking lets concurrent hits on different identifiers proceed in
/// parallel; the `(kind, code)` key enforces per-kind uniqueness the same way
/// the `resources_kind_code_key` constraint does in PostgreSQL.
#[derive(Debug, Default)]
pub struct InMemoryResourceRepository {
    storage: DashMap<(ResourceKind, String), Resource>,
    next_id: AtomicI64,
}

impl InMemoryResourceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored resources across all kinds.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }
}

#[async_trait]
impl ResourceRepository for InMemoryResourceRepository {
    async fn get_resource(
        &self,
        kind: ResourceKind,
        code: &str,
    ) -> Result<Option<Resource>, AppError> {
        Ok(self
            .storage
            .get(&(kind, code.to_string()))
            .map(|r| r.value().clone()))
    }

    async fn create_resource(&self, new_resource: NewResource) -> Result<Resource, AppError> {
        match self
            .storage
            .entry((new_resource.kind, new_resource.code.clone()))
        {
            Entry::Occupied(_) => Err(AppError::duplicate_id(
                "Identifier already exists",
                json!({ "kind": new_resource.kind, "code": new_resource.code }),
            )),
            Entry::Vacant(vacant) => {
                let resource = Resource {
                    id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
                    kind: new_resource.kind,
                    code: new_resource.code,
                    target_url: new_resource.target_url,
                    title: new_resource.title,
                    owner_id: new_resource.owner_id,
                    hits: 0,
                    created_at: Utc::now(),
                };
                vacant.insert(resource.clone());
                Ok(resource)
            }
        }
    }

    async fn increment_counter(
        &self,
        kind: ResourceKind,
        code: &str,
        delta: i64,
    ) -> Result<bool, AppError> {
        match self.storage.get_mut(&(kind, code.to_string())) {
            Some(mut resource) => {
                resource.hits += delta;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn exists_id(&self, kind: ResourceKind, code: &str) -> Result<bool, AppError> {
        Ok(self.storage.contains_key(&(kind, code.to_string())))
    }

    async fn list_by_owner(
        &self,
        kind: ResourceKind,
        query: HistoryQuery,
    ) -> Result<HistoryPage, AppError> {
        let mut owned: Vec<Resource> = self
            .storage
            .iter()
            .filter(|r| r.kind == kind && r.owner_id == Some(query.owner_id))
            .map(|r| r.value().clone())
            .collect();

        owned.sort_by(|a, b| {
            let ordering = match query.sort {
                HistorySort::CreatedAt => a.created_at.cmp(&b.created_at),
                HistorySort::Hits => a.hits.cmp(&b.hits),
            }
            .then(a.id.cmp(&b.id));
            match query.order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });

        let total = owned.len() as i64;
        let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let items = owned
            .into_iter()
            .skip(offset)
            .take(query.limit as usize)
            .collect();

        Ok(HistoryPage { items, total })
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}
