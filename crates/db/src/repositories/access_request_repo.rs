//! Repository for the `access_requests` table.

use sqlx::{PgConnection, PgPool};
use gatekeeper_core::access_request::AccessRequestStatus;
use gatekeeper_core::types::{DbId, Timestamp};

use crate::models::access_request::{AccessRequestFilter, AccessRequestRow, CreateAccessRequest};

/// Joined select producing [`AccessRequestRow`].
const SELECT_JOINED: &str = "SELECT ar.id, ar.requester_id,
        req.email AS requester_email, req.first_name AS requester_first_name,
        req.last_name AS requester_last_name,
        ar.role_id, r.name AS role_name,
        ar.resource_type, ar.resource_id, ar.access_level, ar.justification,
        ar.is_temporary, ar.expires_at, ar.comments, ar.status,
        ar.approver_id, apr.email AS approver_email, apr.first_name AS approver_first_name,
        apr.last_name AS approver_last_name,
        ar.approver_notes, ar.decided_at, ar.created_at, ar.updated_at
    FROM access_requests ar
    JOIN users req ON req.id = ar.requester_id
    LEFT JOIN users apr ON apr.id = ar.approver_id
    LEFT JOIN roles r ON r.id = ar.role_id";

/// Provides persistence for the access request workflow.
pub struct AccessRequestRepo;

impl AccessRequestRepo {
    /// Insert a new pending request and return it joined.
    pub async fn create(
        pool: &PgPool,
        input: &CreateAccessRequest,
    ) -> Result<AccessRequestRow, sqlx::Error> {
        let id = sqlx::query_scalar::<_, DbId>(
            "INSERT INTO access_requests
                (requester_id, role_id, resource_type, resource_id, access_level,
                 justification, is_temporary, expires_at, comments)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING id",
        )
        .bind(input.requester_id)
        .bind(input.role_id)
        .bind(&input.resource_type)
        .bind(&input.resource_id)
        .bind(&input.access_level)
        .bind(input.justification.trim())
        .bind(input.is_temporary)
        .bind(input.expires_at)
        .bind(&input.comments)
        .fetch_one(pool)
        .await?;

        let query = format!("{SELECT_JOINED} WHERE ar.id = $1");
        sqlx::query_as::<_, AccessRequestRow>(&query)
            .bind(id)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<AccessRequestRow>, sqlx::Error> {
        let query = format!("{SELECT_JOINED} WHERE ar.id = $1");
        sqlx::query_as::<_, AccessRequestRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List requests, newest first. `None` filter fields match everything.
    pub async fn list(
        pool: &PgPool,
        filter: &AccessRequestFilter,
    ) -> Result<Vec<AccessRequestRow>, sqlx::Error> {
        let query = format!(
            "{SELECT_JOINED}
             WHERE ($1::uuid IS NULL OR ar.requester_id = $1)
               AND ($2::text IS NULL OR ar.status = $2)
               AND ($3::text IS NULL OR ar.resource_type = $3)
             ORDER BY ar.created_at DESC"
        );
        sqlx::query_as::<_, AccessRequestRow>(&query)
            .bind(filter.requester_id)
            .bind(&filter.status)
            .bind(&filter.resource_type)
            .fetch_all(pool)
            .await
    }

    /// Move a pending request to `status`, recording the deciding user.
    ///
    /// Approving a request that names a role grants that role to the
    /// requester in the same transaction, expiring with the request's
    /// `expires_at` for temporary requests.
    ///
    /// Returns `None` if the request was no longer pending, which happens when
    /// a concurrent decision won.
    pub async fn decide(
        pool: &PgPool,
        id: DbId,
        status: AccessRequestStatus,
        decided_by: DbId,
        notes: Option<&str>,
    ) -> Result<Option<AccessRequestRow>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        // Cancellation is not an approval decision, so it leaves the approver empty.
        let approver = (status != AccessRequestStatus::Cancelled).then_some(decided_by);

        let updated = sqlx::query_as::<_, (DbId, Option<DbId>, Option<Timestamp>)>(
            "UPDATE access_requests SET
                status = $2,
                approver_id = $3,
                approver_notes = $4,
                decided_at = NOW()
             WHERE id = $1 AND status = 'pending'
             RETURNING requester_id, role_id, expires_at",
        )
        .bind(id)
        .bind(status.as_str())
        .bind(approver)
        .bind(notes)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((requester_id, role_id, expires_at)) = updated else {
            return Ok(None);
        };

        if status == AccessRequestStatus::Approved {
            if let Some(role_id) = role_id {
                grant_role(&mut tx, requester_id, role_id, decided_by, expires_at).await?;
            }
        }

        let query = format!("{SELECT_JOINED} WHERE ar.id = $1");
        let row = sqlx::query_as::<_, AccessRequestRow>(&query)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(row))
    }
}

/// Upsert a grant. A permanent grant on either side wins; two temporary
/// grants keep the later expiry.
async fn grant_role(
    conn: &mut PgConnection,
    user_id: DbId,
    role_id: DbId,
    granted_by: DbId,
    expires_at: Option<Timestamp>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO user_roles (user_id, role_id, granted_by, expires_at)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (user_id, role_id) DO UPDATE SET
            granted_by = EXCLUDED.granted_by,
            expires_at = CASE
                WHEN user_roles.expires_at IS NULL OR EXCLUDED.expires_at IS NULL THEN NULL
                ELSE GREATEST(user_roles.expires_at, EXCLUDED.expires_at)
            END",
    )
    .bind(user_id)
    .bind(role_id)
    .bind(granted_by)
    .bind(expires_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}
