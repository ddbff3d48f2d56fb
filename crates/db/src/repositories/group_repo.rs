//! Repository for the `groups` table, `group_members` and `group_roles`.

use sqlx::{PgConnection, PgPool};
use gatekeeper_core::types::DbId;

use crate::models::group::{CreateGroup, Group, UpdateGroup};
use crate::models::role::RoleSummary;
use crate::models::user::UserRef;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, description, created_at, updated_at";

/// Provides CRUD operations for groups and their memberships.
pub struct GroupRepo;

impl GroupRepo {
    /// Insert a group with its initial members and roles.
    pub async fn create(
        pool: &PgPool,
        input: &CreateGroup,
        member_ids: &[DbId],
        role_ids: &[DbId],
    ) -> Result<Group, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO groups (name, description)
             VALUES ($1, $2)
             RETURNING {COLUMNS}"
        );
        let group = sqlx::query_as::<_, Group>(&query)
            .bind(input.name.trim())
            .bind(&input.description)
            .fetch_one(&mut *tx)
            .await?;

        replace_members(&mut tx, group.id, member_ids).await?;
        replace_roles(&mut tx, group.id, role_ids).await?;

        tx.commit().await?;
        Ok(group)
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Group>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM groups WHERE id = $1");
        sqlx::query_as::<_, Group>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<Group>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM groups ORDER BY name");
        sqlx::query_as::<_, Group>(&query).fetch_all(pool).await
    }

    /// Update a group. `Some` member or role lists replace the current ones.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateGroup,
        member_ids: Option<&[DbId]>,
        role_ids: Option<&[DbId]>,
    ) -> Result<Option<Group>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE groups SET
                name = COALESCE($2, name),
                description = COALESCE($3, description)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let Some(group) = sqlx::query_as::<_, Group>(&query)
            .bind(id)
            .bind(input.name.as_deref().map(str::trim))
            .bind(&input.description)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        if let Some(ids) = member_ids {
            replace_members(&mut tx, group.id, ids).await?;
        }
        if let Some(ids) = role_ids {
            replace_roles(&mut tx, group.id, ids).await?;
        }

        tx.commit().await?;
        Ok(Some(group))
    }

    /// Delete a group. Memberships and role links cascade.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM groups WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn members(pool: &PgPool, group_id: DbId) -> Result<Vec<UserRef>, sqlx::Error> {
        sqlx::query_as::<_, UserRef>(
            "SELECT u.id, u.email, u.first_name, u.last_name
             FROM group_members gm
             JOIN users u ON u.id = gm.user_id
             WHERE gm.group_id = $1
             ORDER BY u.email",
        )
        .bind(group_id)
        .fetch_all(pool)
        .await
    }

    pub async fn roles(pool: &PgPool, group_id: DbId) -> Result<Vec<RoleSummary>, sqlx::Error> {
        sqlx::query_as::<_, RoleSummary>(
            "SELECT r.id, r.name, r.is_system_role, NULL::timestamptz AS expires_at
             FROM group_roles gr
             JOIN roles r ON r.id = gr.role_id
             WHERE gr.group_id = $1
             ORDER BY r.name",
        )
        .bind(group_id)
        .fetch_all(pool)
        .await
    }

    /// Add one member. Returns `false` if the user was already a member.
    pub async fn add_member(
        pool: &PgPool,
        group_id: DbId,
        user_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO group_members (group_id, user_id) VALUES ($1, $2)
             ON CONFLICT DO NOTHING",
        )
        .bind(group_id)
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove one member. Returns `true` if a membership was removed.
    pub async fn remove_member(
        pool: &PgPool,
        group_id: DbId,
        user_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM group_members WHERE group_id = $1 AND user_id = $2")
            .bind(group_id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

async fn replace_members(
    conn: &mut PgConnection,
    group_id: DbId,
    user_ids: &[DbId],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM group_members WHERE group_id = $1")
        .bind(group_id)
        .execute(&mut *conn)
        .await?;
    sqlx::query(
        "INSERT INTO group_members (group_id, user_id)
         SELECT $1, UNNEST($2::uuid[])
         ON CONFLICT DO NOTHING",
    )
    .bind(group_id)
    .bind(user_ids)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn replace_roles(
    conn: &mut PgConnection,
    group_id: DbId,
    role_ids: &[DbId],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM group_roles WHERE group_id = $1")
        .bind(group_id)
        .execute(&mut *conn)
        .await?;
    sqlx::query(
        "INSERT INTO group_roles (group_id, role_id)
         SELECT $1, UNNEST($2::uuid[])
         ON CONFLICT DO NOTHING",
    )
    .bind(group_id)
    .bind(role_ids)
    .execute(&mut *conn)
    .await?;
    Ok(())
}
