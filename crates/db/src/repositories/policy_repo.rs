//! Repository for the `policies` table.
//!
//! At most one policy per `policy_type` is active. Writes that activate a
//! policy deactivate its siblings inside the same transaction, before the
//! partial unique index `uq_policies_active_type` is checked.

use sqlx::{PgConnection, PgPool};
use gatekeeper_core::types::DbId;

use crate::models::policy::{CreatePolicy, Policy, UpdatePolicy};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str =
    "id, name, description, policy_type, settings, is_active, created_by, created_at, updated_at";

pub struct PolicyRepo;

impl PolicyRepo {
    pub async fn list(pool: &PgPool) -> Result<Vec<Policy>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM policies ORDER BY policy_type, is_active DESC, created_at DESC"
        );
        sqlx::query_as::<_, Policy>(&query).fetch_all(pool).await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Policy>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM policies WHERE id = $1");
        sqlx::query_as::<_, Policy>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// The active policy of a type, if any.
    pub async fn find_active(
        pool: &PgPool,
        policy_type: &str,
    ) -> Result<Option<Policy>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM policies WHERE policy_type = $1 AND is_active = true");
        sqlx::query_as::<_, Policy>(&query)
            .bind(policy_type)
            .fetch_optional(pool)
            .await
    }

    pub async fn create(pool: &PgPool, input: &CreatePolicy) -> Result<Policy, sqlx::Error> {
        let mut tx = pool.begin().await?;

        if input.is_active {
            deactivate_type(&mut tx, &input.policy_type, None).await?;
        }

        let query = format!(
            "INSERT INTO policies (name, description, policy_type, settings, is_active, created_by)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        let policy = sqlx::query_as::<_, Policy>(&query)
            .bind(input.name.trim())
            .bind(&input.description)
            .bind(&input.policy_type)
            .bind(&input.settings)
            .bind(input.is_active)
            .bind(input.created_by)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(policy)
    }

    /// Update a policy. Only non-`None` fields in `input` are applied.
    ///
    /// `policy_type` is the type of the existing row; it is not changeable.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        policy_type: &str,
        input: &UpdatePolicy,
    ) -> Result<Option<Policy>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        if input.is_active == Some(true) {
            deactivate_type(&mut tx, policy_type, Some(id)).await?;
        }

        let query = format!(
            "UPDATE policies SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                settings = COALESCE($4, settings),
                is_active = COALESCE($5, is_active)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let policy = sqlx::query_as::<_, Policy>(&query)
            .bind(id)
            .bind(input.name.as_deref().map(str::trim))
            .bind(&input.description)
            .bind(&input.settings)
            .bind(input.is_active)
            .fetch_optional(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(policy)
    }

    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM policies WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

async fn deactivate_type(
    conn: &mut PgConnection,
    policy_type: &str,
    except: Option<DbId>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE policies SET is_active = false
         WHERE policy_type = $1 AND is_active = true AND ($2::uuid IS NULL OR id <> $2)",
    )
    .bind(policy_type)
    .bind(except)
    .execute(&mut *conn)
    .await?;
    Ok(())
}
