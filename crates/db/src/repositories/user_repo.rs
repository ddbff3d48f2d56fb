//! Repository for the `users` table and direct role grants (`user_roles`).

use std::collections::HashMap;

use sqlx::{PgConnection, PgPool};
use gatekeeper_core::types::{DbId, Timestamp};

use crate::models::role::{RoleSummary, UserRoleRow};
use crate::models::user::{CreateUser, GuardedChange, UpdateUser, User};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, email, password_hash, first_name, last_name, is_active, is_admin, \
                        last_login_at, failed_login_count, locked_until, password_changed_at, \
                        created_at, updated_at";

/// Provides CRUD operations for users and their direct role grants.
pub struct UserRepo;

impl UserRepo {
    /// Insert a new user, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateUser) -> Result<User, sqlx::Error> {
        let mut conn = pool.acquire().await?;
        insert_user(&mut conn, input).await
    }

    /// Insert a user, grant `role_ids`, and seed password history in one
    /// transaction.
    pub async fn create_with_roles(
        pool: &PgPool,
        input: &CreateUser,
        role_ids: &[DbId],
        granted_by: Option<DbId>,
    ) -> Result<User, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let user = insert_user(&mut tx, input).await?;
        replace_roles(&mut tx, user.id, role_ids, granted_by).await?;

        sqlx::query("INSERT INTO password_history (user_id, password_hash) VALUES ($1, $2)")
            .bind(user.id)
            .bind(&user.password_hash)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(user)
    }

    /// Find a user by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a user by email. Matching is case-insensitive.
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE email = LOWER($1)");
        sqlx::query_as::<_, User>(&query)
            .bind(email.trim())
            .fetch_optional(pool)
            .await
    }

    /// List all users ordered by most recently created first.
    pub async fn list(pool: &PgPool) -> Result<Vec<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users ORDER BY created_at DESC");
        sqlx::query_as::<_, User>(&query).fetch_all(pool).await
    }

    /// Total number of users.
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await
    }

    /// Update a user. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateUser,
    ) -> Result<Option<User>, sqlx::Error> {
        let mut conn = pool.acquire().await?;
        update_user(&mut conn, id, input).await
    }

    /// Apply `input` and, when given, replace the direct role grants with
    /// `role_ids`, all in one transaction.
    ///
    /// The active administrators are locked first, so a deactivation or
    /// demotion that would leave none is refused even under concurrency.
    pub async fn update_guarded(
        pool: &PgPool,
        id: DbId,
        input: &UpdateUser,
        role_ids: Option<&[DbId]>,
        granted_by: Option<DbId>,
    ) -> Result<GuardedChange<User>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let removes_admin = input.is_active == Some(false) || input.is_admin == Some(false);
        if removes_admin && is_last_active_admin(&mut tx, id).await? {
            return Ok(GuardedChange::LastAdmin);
        }

        let Some(user) = update_user(&mut tx, id, input).await? else {
            return Ok(GuardedChange::NotFound);
        };
        if let Some(role_ids) = role_ids {
            replace_roles(&mut tx, id, role_ids, granted_by).await?;
        }

        tx.commit().await?;
        Ok(GuardedChange::Applied(user))
    }

    /// Delete a user unless they are the last active administrator.
    pub async fn delete_guarded(pool: &PgPool, id: DbId) -> Result<GuardedChange<()>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        if is_last_active_admin(&mut tx, id).await? {
            return Ok(GuardedChange::LastAdmin);
        }
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Ok(GuardedChange::NotFound);
        }

        tx.commit().await?;
        Ok(GuardedChange::Applied(()))
    }

    /// Increment the failed login counter, returning the new count.
    pub async fn increment_failed_login(pool: &PgPool, id: DbId) -> Result<i32, sqlx::Error> {
        sqlx::query_scalar::<_, i32>(
            "UPDATE users SET failed_login_count = failed_login_count + 1
             WHERE id = $1
             RETURNING failed_login_count",
        )
        .bind(id)
        .fetch_one(pool)
        .await
    }

    /// Lock the account until the given timestamp. The failure counter
    /// restarts so the next window begins from zero.
    pub async fn lock_account(pool: &PgPool, id: DbId, until: Timestamp) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET locked_until = $2, failed_login_count = 0 WHERE id = $1")
            .bind(id)
            .bind(until)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Reset the lockout state and stamp `last_login_at`.
    pub async fn record_successful_login(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users SET failed_login_count = 0, locked_until = NULL, last_login_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Replace the password hash and record it in the password history.
    pub async fn update_password(
        pool: &PgPool,
        id: DbId,
        password_hash: &str,
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query(
            "UPDATE users SET password_hash = $2, password_changed_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO password_history (user_id, password_hash) VALUES ($1, $2)")
            .bind(id)
            .bind(password_hash)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Unexpired direct roles of a user, ordered by name.
    pub async fn roles_for_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<RoleSummary>, sqlx::Error> {
        sqlx::query_as::<_, RoleSummary>(
            "SELECT r.id, r.name, r.is_system_role, ur.expires_at
             FROM user_roles ur
             JOIN roles r ON r.id = ur.role_id
             WHERE ur.user_id = $1
               AND (ur.expires_at IS NULL OR ur.expires_at > NOW())
             ORDER BY r.name",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Unexpired direct roles for many users at once, keyed by user id.
    pub async fn roles_for_users(
        pool: &PgPool,
        user_ids: &[DbId],
    ) -> Result<HashMap<DbId, Vec<RoleSummary>>, sqlx::Error> {
        let rows = sqlx::query_as::<_, UserRoleRow>(
            "SELECT ur.user_id, r.id, r.name, r.is_system_role, ur.expires_at
             FROM user_roles ur
             JOIN roles r ON r.id = ur.role_id
             WHERE ur.user_id = ANY($1)
               AND (ur.expires_at IS NULL OR ur.expires_at > NOW())
             ORDER BY r.name",
        )
        .bind(user_ids)
        .fetch_all(pool)
        .await?;

        let mut by_user: HashMap<DbId, Vec<RoleSummary>> = HashMap::new();
        for row in rows {
            by_user.entry(row.user_id).or_default().push(row.into());
        }
        Ok(by_user)
    }

    /// Names of every permission the user holds through unexpired direct roles
    /// or through the roles of their groups.
    pub async fn effective_permissions(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT p.name
             FROM permissions p
             JOIN role_permissions rp ON rp.permission_id = p.id
             WHERE rp.role_id IN (
                 SELECT ur.role_id FROM user_roles ur
                 WHERE ur.user_id = $1
                   AND (ur.expires_at IS NULL OR ur.expires_at > NOW())
                 UNION
                 SELECT gr.role_id FROM group_roles gr
                 JOIN group_members gm ON gm.group_id = gr.group_id
                 WHERE gm.user_id = $1
             )
             ORDER BY p.name",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Delete role grants whose `expires_at` has passed. Returns the count.
    pub async fn remove_expired_grants(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM user_roles WHERE expires_at IS NOT NULL AND expires_at <= NOW()",
        )
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}

async fn insert_user(conn: &mut PgConnection, input: &CreateUser) -> Result<User, sqlx::Error> {
    let query = format!(
        "INSERT INTO users (email, password_hash, first_name, last_name, is_admin)
         VALUES (LOWER($1), $2, $3, $4, $5)
         RETURNING {COLUMNS}"
    );
    sqlx::query_as::<_, User>(&query)
        .bind(input.email.trim())
        .bind(&input.password_hash)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(input.is_admin)
        .fetch_one(conn)
        .await
}

async fn update_user(
    conn: &mut PgConnection,
    id: DbId,
    input: &UpdateUser,
) -> Result<Option<User>, sqlx::Error> {
    let query = format!(
        "UPDATE users SET
            first_name = COALESCE($2, first_name),
            last_name = COALESCE($3, last_name),
            is_active = COALESCE($4, is_active),
            is_admin = COALESCE($5, is_admin)
         WHERE id = $1
         RETURNING {COLUMNS}"
    );
    sqlx::query_as::<_, User>(&query)
        .bind(id)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(input.is_active)
        .bind(input.is_admin)
        .fetch_optional(conn)
        .await
}

/// Lock every active administrator row and report whether `id` is the only
/// one.
async fn is_last_active_admin(conn: &mut PgConnection, id: DbId) -> Result<bool, sqlx::Error> {
    let admins = sqlx::query_scalar::<_, DbId>(
        "SELECT id FROM users WHERE is_admin = true AND is_active = true FOR UPDATE",
    )
    .fetch_all(conn)
    .await?;
    Ok(admins.len() <= 1 && admins.contains(&id))
}

/// Replace permanent grants. Temporary grants not named in `role_ids` are
/// dropped too; named ones become permanent.
async fn replace_roles(
    conn: &mut PgConnection,
    user_id: DbId,
    role_ids: &[DbId],
    granted_by: Option<DbId>,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM user_roles WHERE user_id = $1 AND NOT (role_id = ANY($2))")
        .bind(user_id)
        .bind(role_ids)
        .execute(&mut *conn)
        .await?;

    sqlx::query(
        "INSERT INTO user_roles (user_id, role_id, granted_by)
         SELECT $1, r, $3 FROM (SELECT DISTINCT UNNEST($2::uuid[]) AS r) AS d
         ON CONFLICT (user_id, role_id) DO UPDATE SET expires_at = NULL",
    )
    .bind(user_id)
    .bind(role_ids)
    .bind(granted_by)
    .execute(&mut *conn)
    .await?;

    Ok(())
}
