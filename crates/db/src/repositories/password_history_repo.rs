//! Repository for the `password_history` table.

use sqlx::PgPool;
use gatekeeper_core::types::DbId;

/// Read access to `password_history`. Rows are written by
/// [`UserRepo`](crate::repositories::UserRepo) whenever a password is set.
pub struct PasswordHistoryRepo;

impl PasswordHistoryRepo {
    /// The `limit` most recent password hashes of a user, newest first.
    pub async fn recent(
        pool: &PgPool,
        user_id: DbId,
        limit: i64,
    ) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT password_hash FROM password_history
             WHERE user_id = $1
             ORDER BY created_at DESC
             LIMIT $2",
        )
        .bind(user_id)
        .bind(limit.max(0))
        .fetch_all(pool)
        .await
    }

    /// Trim history beyond the `keep` most recent entries.
    pub async fn prune(pool: &PgPool, user_id: DbId, keep: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM password_history
             WHERE user_id = $1 AND id NOT IN (
                 SELECT id FROM password_history
                 WHERE user_id = $1
                 ORDER BY created_at DESC
                 LIMIT $2
             )",
        )
        .bind(user_id)
        .bind(keep.max(1))
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
