//! Repository for the `user_invitations` table.

use sqlx::PgPool;
use gatekeeper_core::types::DbId;

use crate::models::invitation::{CreateInvitation, Invitation};

/// Joined select producing [`Invitation`].
const SELECT_JOINED: &str = "SELECT i.id, i.email, i.first_name, i.last_name, i.token_hash,
        i.role_id, r.name AS role_name, i.invited_by, u.email AS inviter_email,
        i.used, i.expires_at, i.created_at
    FROM user_invitations i
    LEFT JOIN roles r ON r.id = i.role_id
    LEFT JOIN users u ON u.id = i.invited_by";

pub struct InvitationRepo;

impl InvitationRepo {
    pub async fn create(pool: &PgPool, input: &CreateInvitation) -> Result<Invitation, sqlx::Error> {
        let id = sqlx::query_scalar::<_, DbId>(
            "INSERT INTO user_invitations
                (email, first_name, last_name, token_hash, role_id, invited_by, expires_at)
             VALUES (LOWER($1), $2, $3, $4, $5, $6, $7)
             RETURNING id",
        )
        .bind(input.email.trim())
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(&input.token_hash)
        .bind(input.role_id)
        .bind(input.invited_by)
        .bind(input.expires_at)
        .fetch_one(pool)
        .await?;

        let query = format!("{SELECT_JOINED} WHERE i.id = $1");
        sqlx::query_as::<_, Invitation>(&query)
            .bind(id)
            .fetch_one(pool)
            .await
    }

    /// Unused, unexpired invitations, newest first.
    pub async fn list_active(pool: &PgPool) -> Result<Vec<Invitation>, sqlx::Error> {
        let query = format!(
            "{SELECT_JOINED}
             WHERE i.used = false AND i.expires_at > NOW()
             ORDER BY i.created_at DESC"
        );
        sqlx::query_as::<_, Invitation>(&query).fetch_all(pool).await
    }

    /// Look up an invitation by token digest regardless of state.
    pub async fn find_by_token_hash(
        pool: &PgPool,
        token_hash: &str,
    ) -> Result<Option<Invitation>, sqlx::Error> {
        let query = format!("{SELECT_JOINED} WHERE i.token_hash = $1");
        sqlx::query_as::<_, Invitation>(&query)
            .bind(token_hash)
            .fetch_optional(pool)
            .await
    }

    /// The pending invitation for an email, if one exists.
    pub async fn find_active_by_email(
        pool: &PgPool,
        email: &str,
    ) -> Result<Option<Invitation>, sqlx::Error> {
        let query = format!(
            "{SELECT_JOINED}
             WHERE i.email = LOWER($1) AND i.used = false AND i.expires_at > NOW()
             LIMIT 1"
        );
        sqlx::query_as::<_, Invitation>(&query)
            .bind(email.trim())
            .fetch_optional(pool)
            .await
    }

    /// Expire a pending invitation immediately. Returns `true` if it was pending.
    pub async fn revoke(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE user_invitations SET expires_at = NOW()
             WHERE id = $1 AND used = false AND expires_at > NOW()",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark an invitation used. Returns `false` if it was already used.
    pub async fn mark_used(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE user_invitations SET used = true WHERE id = $1 AND used = false")
                .bind(id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}
