//! JWT-based authentication extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use gatekeeper_core::error::CoreError;
use gatekeeper_core::permission::PermissionSet;
use gatekeeper_core::types::DbId;
use gatekeeper_db::repositories::{SessionRepo, UserRepo};

use crate::auth::jwt::validate_token;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Authenticated user extracted from a JWT Bearer token in the `Authorization` header.
///
/// A token is only accepted while the session it names is unrevoked and
/// unexpired and its user exists and is active. Every failure is a 401 so
/// clients know to log in again.
///
/// ```ignore
/// async fn my_handler(user: AuthUser) -> AppResult<Json<()>> {
///     user.require(names::USER_READ)?;
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The user's id (from `claims.sub`).
    pub user_id: DbId,
    /// The session the token belongs to (from `claims.sid`).
    pub session_id: DbId,
    pub email: String,
    /// Current administrator flag, read from the database.
    pub is_admin: bool,
    /// Effective permissions through direct and group roles.
    pub permissions: PermissionSet,
}

impl AuthUser {
    /// Whether the user holds `permission`. Administrators hold everything.
    pub fn can(&self, permission: &str) -> bool {
        self.is_admin || self.permissions.allows(permission)
    }

    /// Reject with 403 unless the user holds `permission`.
    pub fn require(&self, permission: &str) -> AppResult<()> {
        if self.can(permission) {
            Ok(())
        } else {
            Err(AppError::Core(CoreError::Forbidden(format!(
                "Missing permission: {permission}"
            ))))
        }
    }

    /// Reject with 403 unless the user is `user_id` or holds `permission`.
    pub fn require_self_or(&self, user_id: DbId, permission: &str) -> AppResult<()> {
        if self.user_id == user_id {
            Ok(())
        } else {
            self.require(permission)
        }
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| unauthorized("Missing Authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| unauthorized("Invalid Authorization format. Expected: Bearer <token>"))?;

        let claims = validate_token(token, &state.config.jwt)
            .map_err(|_| unauthorized("Invalid or expired token"))?;

        let session = SessionRepo::find_active(&state.pool, claims.sid)
            .await?
            .filter(|s| s.user_id == claims.sub)
            .ok_or_else(|| unauthorized("Session has ended. Please log in again"))?;

        let user = UserRepo::find_by_id(&state.pool, session.user_id)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(|| unauthorized("Account is no longer active"))?;

        let names = UserRepo::effective_permissions(&state.pool, user.id).await?;

        Ok(AuthUser {
            user_id: user.id,
            session_id: session.id,
            email: user.email,
            is_admin: user.is_admin,
            permissions: PermissionSet::from_names(names),
        })
    }
}

fn unauthorized(message: &str) -> AppError {
    AppError::Core(CoreError::Unauthorized(message.into()))
}
