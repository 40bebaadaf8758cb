//! Organization and tag directory repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;

use microbadge_core::error::{AppError, ErrorKind};
use microbadge_core::result::AppResult;
use microbadge_core::types::{OrgId, TagId, UserId};
use microbadge_entity::organization::Organization;

use crate::store::Directory;

/// Read-only view of the directory tables.
#[derive(Debug, Clone)]
pub struct DirectoryRepository {
    pool: PgPool,
}

impl DirectoryRepository {
    /// Create a new directory repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Directory for DirectoryRepository {
    async fn organizations(&self) -> AppResult<Vec<Organization>> {
        sqlx::query_as::<_, Organization>("SELECT id, name, parent_id FROM organizations ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to load organizations", e)
            })
    }

    async fn users_in_organizations(&self, org_ids: &[OrgId]) -> AppResult<Vec<UserId>> {
        if org_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<String> = org_ids.iter().map(|id| id.as_str().to_string()).collect();
        sqlx::query_scalar::<_, UserId>("SELECT id FROM users WHERE org_id = ANY($1) ORDER BY id")
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to load organization users", e)
            })
    }

    async fn tagged_users(&self, tag_id: &TagId) -> AppResult<Vec<UserId>> {
        sqlx::query_scalar::<_, UserId>(
            "SELECT user_id FROM user_tags WHERE tag_id = $1 ORDER BY user_id",
        )
        .bind(tag_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load tagged users", e))
    }

    async fn organization_name(&self, id: &OrgId) -> AppResult<Option<String>> {
        sqlx::query_scalar("SELECT name FROM organizations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find organization", e)
            })
    }

    async fn tag_name(&self, id: &TagId) -> AppResult<Option<String>> {
        sqlx::query_scalar("SELECT name FROM tags WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find tag", e))
    }
}
