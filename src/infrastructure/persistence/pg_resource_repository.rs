//! PostgreSQL implementation of the resource repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::{FromRow, PgPool};
use std::sync::Arc;

use crate::domain::entities::{HistoryPage, HistoryQuery, NewResource, Resource, ResourceKind};
use crate::domain::repositories::ResourceRepository;
use crate::error::AppError;

const RESOURCE_COLUMNS: &str = "id, kind, code, target_url, title, owner_id, hits, created_at";

#[derive(Debug, FromRow)]
struct ResourceRow {
    id: i64,
    kind: String,
    code: String,
    target_url: String,
    title: Option<String>,
    owner_id: Option<i64>,
    hits: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<ResourceRow> for Resource {
    type Error = AppError;

    fn try_from(row: ResourceRow) -> Result<Self, Self::Error> {
        let kind = row.kind.parse::<ResourceKind>().map_err(|e| {
            AppError::internal("Corrupt resource row", json!({ "reason": e.to_string() }))
        })?;

        Ok(Resource {
            id: row.id,
            kind,
            code: row.code,
            target_url: row.target_url,
            title: row.title,
            owner_id: row.owner_id,
            hits: row.hits,
            created_at: row.created_at,
        })
    }
}

/// PostgreSQL repository for resources and their hit counters.
///
/// Queries are built at runtime (`query_as` + `FromRow`) so the crate builds
/// without a live database.
pub struct PgResourceRepository {
    pool: Arc<PgPool>,
}

impl PgResourceRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResourceRepository for PgResourceRepository {
    async fn get_resource(
        &self,
        kind: ResourceKind,
        code: &str,
    ) -> Result<Option<Resource>, AppError> {
        let sql = format!("SELECT {RESOURCE_COLUMNS} FROM resources WHERE kind = $1 AND code = $2");

        let row = sqlx::query_as::<_, ResourceRow>(&sql)
            .bind(kind.as_str())
            .bind(code)
            .fetch_optional(self.pool.as_ref())
            .await?;

        row.map(Resource::try_from).transpose()
    }

    async fn create_resource(&self, new_resource: NewResource) -> Result<Resource, AppError> {
        let sql = format!(
            r#"
            INSERT INTO resources (kind, code, target_url, title, owner_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {RESOURCE_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, ResourceRow>(&sql)
            .bind(new_resource.kind.as_str())
            .bind(&new_resource.code)
            .bind(&new_resource.target_url)
            .bind(&new_resource.title)
            .bind(new_resource.owner_id)
            .fetch_one(self.pool.as_ref())
            .await?;

        Resource::try_from(row)
    }

    async fn increment_counter(
        &self,
        kind: ResourceKind,
        code: &str,
        delta: i64,
    ) -> Result<bool, AppError> {
        let result =
            sqlx::query("UPDATE resources SET hits = hits + $3 WHERE kind = $1 AND code = $2")
                .bind(kind.as_str())
                .bind(code)
                .bind(delta)
                .execute(self.pool.as_ref())
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn exists_id(&self, kind: ResourceKind, code: &str) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM resources WHERE kind = $1 AND code = $2)",
        )
        .bind(kind.as_str())
        .bind(code)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(exists)
    }

    async fn list_by_owner(
        &self,
        kind: ResourceKind,
        query: HistoryQuery,
    ) -> Result<HistoryPage, AppError> {
        // Column and direction come from closed enums, never from input text.
        let sql = format!(
            r#"
            SELECT {RESOURCE_COLUMNS}
            FROM resources
            WHERE kind = $1 AND owner_id = $2
            ORDER BY {column} {dir}, id {dir}
            LIMIT $3 OFFSET $4
            "#,
            column = query.sort.column(),
            dir = query.order.keyword(),
        );

        let rows = sqlx::query_as::<_, ResourceRow>(&sql)
            .bind(kind.as_str())
            .bind(query.owner_id)
            .bind(i64::from(query.limit))
            .bind(query.offset())
            .fetch_all(self.pool.as_ref())
            .await?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM resources WHERE kind = $1 AND owner_id = $2")
                .bind(kind.as_str())
                .bind(query.owner_id)
                .fetch_one(self.pool.as_ref())
                .await?;

        let items = rows
            .into_iter()
            .map(Resource::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(HistoryPage { items, total })
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(self.pool.as_ref()).await?;
        Ok(())
    }
}
