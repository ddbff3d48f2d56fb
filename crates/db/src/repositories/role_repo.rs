//! Repository for the `roles` table and its permission links.

use std::collections::HashMap;

use sqlx::{PgConnection, PgPool};
use gatekeeper_core::types::DbId;

use crate::models::permission::{Permission, RolePermissionRow};
use crate::models::role::{CreateRole, Role, UpdateRole};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, description, is_system_role, created_at, updated_at";

/// Provides CRUD operations for roles.
pub struct RoleRepo;

impl RoleRepo {
    /// Find a role by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Role>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM roles WHERE id = $1");
        sqlx::query_as::<_, Role>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a role by name (case-sensitive).
    pub async fn find_by_name(pool: &PgPool, name: &str) -> Result<Option<Role>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM roles WHERE name = $1");
        sqlx::query_as::<_, Role>(&query)
            .bind(name)
            .fetch_optional(pool)
            .await
    }

    /// List all roles, system roles first, then by name.
    pub async fn list(pool: &PgPool) -> Result<Vec<Role>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM roles ORDER BY is_system_role DESC, name ASC");
        sqlx::query_as::<_, Role>(&query).fetch_all(pool).await
    }

    /// Insert a role together with its permission links.
    pub async fn create(
        pool: &PgPool,
        input: &CreateRole,
        permission_ids: &[DbId],
    ) -> Result<Role, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO roles (name, description, is_system_role)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        let role = sqlx::query_as::<_, Role>(&query)
            .bind(input.name.trim())
            .bind(&input.description)
            .bind(input.is_system_role)
            .fetch_one(&mut *tx)
            .await?;

        replace_permissions(&mut tx, role.id, permission_ids).await?;

        tx.commit().await?;
        Ok(role)
    }

    /// Update a role. When `permission_ids` is `Some`, the permission set is
    /// replaced in the same transaction.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateRole,
        permission_ids: Option<&[DbId]>,
    ) -> Result<Option<Role>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE roles SET
                name = COALESCE($2, name),
                description = COALESCE($3, description)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let Some(role) = sqlx::query_as::<_, Role>(&query)
            .bind(id)
            .bind(input.name.as_deref().map(str::trim))
            .bind(&input.description)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        if let Some(ids) = permission_ids {
            replace_permissions(&mut tx, role.id, ids).await?;
        }

        tx.commit().await?;
        Ok(Some(role))
    }

    /// Delete a role by ID. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Permissions linked to one role, ordered by name.
    pub async fn permissions_for_role(
        pool: &PgPool,
        role_id: DbId,
    ) -> Result<Vec<Permission>, sqlx::Error> {
        sqlx::query_as::<_, Permission>(
            "SELECT p.id, p.name, p.description, p.resource, p.action, p.created_at, p.updated_at
             FROM permissions p
             JOIN role_permissions rp ON rp.permission_id = p.id
             WHERE rp.role_id = $1
             ORDER BY p.name",
        )
        .bind(role_id)
        .fetch_all(pool)
        .await
    }

    /// Permissions of every role, keyed by role id.
    pub async fn permissions_for_all(
        pool: &PgPool,
    ) -> Result<HashMap<DbId, Vec<Permission>>, sqlx::Error> {
        let rows = sqlx::query_as::<_, RolePermissionRow>(
            "SELECT rp.role_id, p.id, p.name, p.description, p.resource, p.action,
                    p.created_at, p.updated_at
             FROM role_permissions rp
             JOIN permissions p ON p.id = rp.permission_id
             ORDER BY p.name",
        )
        .fetch_all(pool)
        .await?;

        let mut by_role: HashMap<DbId, Vec<Permission>> = HashMap::new();
        for row in rows {
            by_role.entry(row.role_id).or_default().push(row.permission);
        }
        Ok(by_role)
    }

    /// Number of users holding each role directly (unexpired grants only).
    pub async fn user_counts(pool: &PgPool) -> Result<HashMap<DbId, i64>, sqlx::Error> {
        let rows = sqlx::query_as::<_, (DbId, i64)>(
            "SELECT role_id, COUNT(*) FROM user_roles
             WHERE expires_at IS NULL OR expires_at > NOW()
             GROUP BY role_id",
        )
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().collect())
    }

    /// Number of users holding one role directly.
    pub async fn user_count(pool: &PgPool, role_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM user_roles
             WHERE role_id = $1 AND (expires_at IS NULL OR expires_at > NOW())",
        )
        .bind(role_id)
        .fetch_one(pool)
        .await
    }
}

async fn replace_permissions(
    conn: &mut PgConnection,
    role_id: DbId,
    permission_ids: &[DbId],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
        .bind(role_id)
        .execute(&mut *conn)
        .await?;

    sqlx::query(
        "INSERT INTO role_permissions (role_id, permission_id)
         SELECT $1, UNNEST($2::uuid[])
         ON CONFLICT DO NOTHING",
    )
    .bind(role_id)
    .bind(permission_ids)
    .execute(&mut *conn)
    .await?;

    Ok(())
}
