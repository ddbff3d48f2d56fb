//! Repository for the `permissions` table.

use sqlx::PgPool;
use gatekeeper_core::types::DbId;

use crate::models::permission::{CreatePermission, Permission, UpdatePermission};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, description, resource, action, created_at, updated_at";

/// Provides CRUD operations for permissions.
pub struct PermissionRepo;

impl PermissionRepo {
    pub async fn create(pool: &PgPool, input: &CreatePermission) -> Result<Permission, sqlx::Error> {
        let query = format!(
            "INSERT INTO permissions (name, description, resource, action)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Permission>(&query)
            .bind(&input.name)
            .bind(&input.description)
            .bind(&input.resource)
            .bind(&input.action)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Permission>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM permissions WHERE id = $1");
        sqlx::query_as::<_, Permission>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all permissions grouped by resource.
    pub async fn list(pool: &PgPool) -> Result<Vec<Permission>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM permissions ORDER BY resource, action");
        sqlx::query_as::<_, Permission>(&query).fetch_all(pool).await
    }

    /// Update a permission. Only non-`None` fields in `input` are applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdatePermission,
    ) -> Result<Option<Permission>, sqlx::Error> {
        let query = format!(
            "UPDATE permissions SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                resource = COALESCE($4, resource),
                action = COALESCE($5, action)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Permission>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(&input.resource)
            .bind(&input.action)
            .fetch_optional(pool)
            .await
    }

    /// Delete a permission. Role links cascade.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM permissions WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
