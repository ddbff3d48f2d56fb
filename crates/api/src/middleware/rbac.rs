//! Administrator gate.
//!
//! Permission checks are data-driven (`AuthUser::require`); this extractor
//! covers the few operations reserved for administrators regardless of
//! granted permissions. Only administrators hand out the `admin` role, on
//! whatever path the grant takes.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use gatekeeper_core::error::CoreError;
use gatekeeper_core::roles::ROLE_ADMIN;
use gatekeeper_core::types::DbId;
use gatekeeper_db::repositories::RoleRepo;

use super::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Requires `is_admin`. Rejects with 403 Forbidden otherwise.
///
/// ```ignore
/// async fn admin_only(RequireAdmin(user): RequireAdmin) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
pub struct RequireAdmin(pub AuthUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin {
            return Err(AppError::Core(CoreError::Forbidden(
                "Administrator access required".into(),
            )));
        }
        Ok(RequireAdmin(user))
    }
}

/// Fail with 403 and `message` unless the caller is an administrator.
pub fn require_admin(auth: &AuthUser, message: &str) -> AppResult<()> {
    if auth.is_admin {
        Ok(())
    } else {
        Err(AppError::Core(CoreError::Forbidden(message.into())))
    }
}

/// Granting the `admin` role, directly or through a group, is reserved to
/// administrators.
pub async fn ensure_can_grant(state: &AppState, auth: &AuthUser, role_ids: &[DbId]) -> AppResult<()> {
    if auth.is_admin || role_ids.is_empty() {
        return Ok(());
    }
    let admin_role = RoleRepo::find_by_name(&state.pool, ROLE_ADMIN).await?;
    if admin_role.is_some_and(|r| role_ids.contains(&r.id)) {
        return require_admin(auth, "Only administrators can grant the admin role");
    }
    Ok(())
}
