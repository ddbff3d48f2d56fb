//! Loading the security policies in force.
//!
//! Each policy type has at most one active row. When none is active the
//! built-in defaults apply (for sessions, the server configuration).

use serde::de::DeserializeOwned;
use sqlx::PgPool;
use gatekeeper_core::error::CoreError;
use gatekeeper_core::policy::{stored_or_default, LoginPolicy, PasswordPolicy, PolicyType, SessionPolicy};
use gatekeeper_core::types::DbId;
use gatekeeper_db::repositories::{PasswordHistoryRepo, PolicyRepo};

use crate::auth::password::verify_password;
use crate::error::{AppError, AppResult};

/// Settings of the active policy of `policy_type`, or `None` when no policy
/// of that type is active.
pub async fn active<T: DeserializeOwned + Default>(
    pool: &PgPool,
    policy_type: PolicyType,
) -> AppResult<Option<T>> {
    let policy = PolicyRepo::find_active(pool, policy_type.as_str()).await?;
    Ok(policy.map(|p| stored_or_default(Some(&p.settings))))
}

pub async fn password_policy(pool: &PgPool) -> AppResult<PasswordPolicy> {
    Ok(active(pool, PolicyType::Password).await?.unwrap_or_default())
}

pub async fn login_policy(pool: &PgPool) -> AppResult<LoginPolicy> {
    Ok(active(pool, PolicyType::Login).await?.unwrap_or_default())
}

pub async fn session_policy(pool: &PgPool) -> AppResult<Option<SessionPolicy>> {
    active(pool, PolicyType::Session).await
}

/// Validate a new password against the password policy and, for an
/// existing user, against their recent passwords.
///
/// Returns the policy that was applied.
pub async fn check_new_password(
    pool: &PgPool,
    user_id: Option<DbId>,
    password: &str,
) -> AppResult<PasswordPolicy> {
    let policy = password_policy(pool).await?;
    policy.enforce(password)?;

    if let Some(user_id) = user_id {
        if policy.password_history > 0 {
            let recent =
                PasswordHistoryRepo::recent(pool, user_id, i64::from(policy.password_history))
                    .await?;
            for hash in &recent {
                let reused = verify_password(password, hash).map_err(|e| {
                    AppError::InternalError(format!("Password verification error: {e}"))
                })?;
                if reused {
                    return Err(AppError::Core(CoreError::Validation(format!(
                        "Password must differ from your last {} passwords",
                        policy.password_history
                    ))));
                }
            }
        }
    }

    Ok(policy)
}
