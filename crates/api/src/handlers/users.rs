//! Handlers for the `/iam/users` resource.
//!
//! Reads need `user:read` (or the caller's own record), writes need
//! `user:write`. Administrator status can only be changed by an
//! administrator, and the last active administrator cannot be removed.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use gatekeeper_core::audit::{actions, resources};
use gatekeeper_core::error::CoreError;
use gatekeeper_core::permission::names;
use gatekeeper_core::types::DbId;
use gatekeeper_core::validation::{clean_optional, normalize_email};
use gatekeeper_db::models::user::{CreateUser, GuardedChange, UpdateUser, User, UserResponse};
use gatekeeper_db::repositories::{SessionRepo, UserRepo};

use crate::audit::AuditEvent;
use crate::auth::password::hash_password;
use crate::error::{AppError, AppJson, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::client::ClientInfo;
use crate::middleware::rbac::{ensure_can_grant, require_admin, RequireAdmin};
use crate::policy;
use crate::response::RevokedSessionsResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Request body for `POST /iam/users`.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    #[serde(alias = "firstName")]
    pub first_name: Option<String>,
    #[serde(alias = "lastName")]
    pub last_name: Option<String>,
    #[serde(default, alias = "isAdmin")]
    pub is_admin: bool,
    #[serde(default, alias = "roles", alias = "roleIds")]
    pub role_ids: Vec<DbId>,
}

/// Request body for `PUT /iam/users/{id}`.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(alias = "firstName")]
    pub first_name: Option<String>,
    #[serde(alias = "lastName")]
    pub last_name: Option<String>,
    #[serde(alias = "isActive")]
    pub is_active: Option<bool>,
    #[serde(alias = "isAdmin")]
    pub is_admin: Option<bool>,
    #[serde(alias = "roles", alias = "roleIds")]
    pub role_ids: Option<Vec<DbId>>,
}

/// Request body for `PUT /iam/users/{id}/status`.
#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    #[serde(alias = "isActive")]
    pub is_active: bool,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/iam/users
pub async fn list_users(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<Vec<UserResponse>>> {
    auth.require(names::USER_READ)?;

    let users = UserRepo::list(&state.pool).await?;
    let ids: Vec<DbId> = users.iter().map(|u| u.id).collect();
    let mut roles = UserRepo::roles_for_users(&state.pool, &ids).await?;

    let responses = users
        .iter()
        .map(|u| UserResponse::new(u, roles.remove(&u.id).unwrap_or_default()))
        .collect();

    Ok(Json(responses))
}

/// GET /api/iam/users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<UserResponse>> {
    auth.require_self_or(id, names::USER_READ)?;

    let user = find_user(&state, id).await?;
    Ok(Json(user_to_response(&state, &user).await?))
}

/// POST /api/iam/users
///
/// Create an account directly (no invitation). The password must satisfy
/// the active password policy.
pub async fn create_user(
    State(state): State<AppState>,
    auth: AuthUser,
    client: ClientInfo,
    AppJson(input): AppJson<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    auth.require(names::USER_WRITE)?;
    if input.is_admin {
        require_admin(&auth, "Only administrators can create administrators")?;
    }
    ensure_can_grant(&state, &auth, &input.role_ids).await?;

    let email = normalize_email(&input.email)?;
    policy::check_new_password(&state.pool, None, &input.password).await?;
    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let create = CreateUser {
        email,
        password_hash,
        first_name: clean_optional(input.first_name),
        last_name: clean_optional(input.last_name),
        is_admin: input.is_admin,
    };
    let user =
        UserRepo::create_with_roles(&state.pool, &create, &input.role_ids, Some(auth.user_id))
            .await?;

    AuditEvent::new(actions::CREATE, resources::USER)
        .by(auth.user_id)
        .resource(user.id)
        .details(json!({
            "email": user.email,
            "is_admin": user.is_admin,
            "role_ids": input.role_ids,
        }))
        .record(&state.pool, &client)
        .await;
    tracing::info!(user_id = %user.id, created_by = %auth.user_id, "User created");

    Ok((StatusCode::CREATED, Json(user_to_response(&state, &user).await?)))
}

/// PUT /api/iam/users/{id}
///
/// Users may edit their own names. Status, administrator flag and role
/// changes need `user:write`.
pub async fn update_user(
    State(state): State<AppState>,
    auth: AuthUser,
    client: ClientInfo,
    Path(id): Path<DbId>,
    AppJson(input): AppJson<UpdateUserRequest>,
) -> AppResult<Json<UserResponse>> {
    let privileged = input.is_active.is_some() || input.is_admin.is_some() || input.role_ids.is_some();
    if privileged {
        auth.require(names::USER_WRITE)?;
    } else {
        auth.require_self_or(id, names::USER_WRITE)?;
    }
    if input.is_admin.is_some() {
        require_admin(&auth, "Only administrators can change administrator status")?;
    }

    let target = find_user(&state, id).await?;
    let deactivating = input.is_active == Some(false);
    let demoting = input.is_admin == Some(false);
    ensure_not_self(&auth, id, deactivating || demoting, "deactivate or demote")?;

    if let Some(role_ids) = &input.role_ids {
        ensure_can_grant(&state, &auth, role_ids).await?;
    }

    let update = UpdateUser {
        first_name: clean_optional(input.first_name),
        last_name: clean_optional(input.last_name),
        is_active: input.is_active,
        is_admin: input.is_admin,
    };
    let change = UserRepo::update_guarded(
        &state.pool,
        id,
        &update,
        input.role_ids.as_deref(),
        Some(auth.user_id),
    )
    .await?;
    let user = applied(change, id)?;

    if deactivating && target.is_active {
        SessionRepo::revoke_all_for_user(&state.pool, id).await?;
    }

    AuditEvent::new(actions::UPDATE, resources::USER)
        .by(auth.user_id)
        .resource(id)
        .details(json!({
            "first_name": update.first_name,
            "last_name": update.last_name,
            "is_active": update.is_active,
            "is_admin": update.is_admin,
            "role_ids": input.role_ids,
        }))
        .record(&state.pool, &client)
        .await;

    Ok(Json(user_to_response(&state, &user).await?))
}

/// PUT /api/iam/users/{id}/status
///
/// Activate or deactivate one user. Deactivation ends the user's sessions.
pub async fn set_user_status(
    State(state): State<AppState>,
    auth: AuthUser,
    client: ClientInfo,
    Path(id): Path<DbId>,
    AppJson(input): AppJson<SetStatusRequest>,
) -> AppResult<Json<UserResponse>> {
    auth.require(names::USER_WRITE)?;

    let target = find_user(&state, id).await?;
    ensure_not_self(&auth, id, !input.is_active, "deactivate")?;

    let update = UpdateUser {
        is_active: Some(input.is_active),
        ..Default::default()
    };
    let user = applied(UserRepo::update_guarded(&state.pool, id, &update, None, None).await?, id)?;

    if !input.is_active && target.is_active {
        let revoked = SessionRepo::revoke_all_for_user(&state.pool, id).await?;
        tracing::info!(user_id = %id, revoked, "User deactivated");
    }

    AuditEvent::new(actions::UPDATE, resources::USER)
        .by(auth.user_id)
        .resource(id)
        .details(json!({ "is_active": input.is_active }))
        .record(&state.pool, &client)
        .await;

    Ok(Json(user_to_response(&state, &user).await?))
}

/// DELETE /api/iam/users/{id}
pub async fn delete_user(
    State(state): State<AppState>,
    auth: AuthUser,
    client: ClientInfo,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    auth.require(names::USER_WRITE)?;
    ensure_not_self(&auth, id, true, "delete")?;

    let target = find_user(&state, id).await?;
    applied(UserRepo::delete_guarded(&state.pool, id).await?, id)?;

    AuditEvent::new(actions::DELETE, resources::USER)
        .by(auth.user_id)
        .resource(id)
        .details(json!({ "email": target.email }))
        .record(&state.pool, &client)
        .await;
    tracing::info!(user_id = %id, deleted_by = %auth.user_id, "User deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/iam/users/{id}/revoke-sessions
///
/// Sign a user out everywhere. Administrators only.
pub async fn revoke_user_sessions(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    client: ClientInfo,
    Path(id): Path<DbId>,
) -> AppResult<Json<RevokedSessionsResponse>> {
    find_user(&state, id).await?;
    let revoked = SessionRepo::revoke_all_for_user(&state.pool, id).await?;

    AuditEvent::new(actions::REVOKE, resources::SESSION)
        .by(admin.user_id)
        .resource(id)
        .details(json!({ "revoked": revoked }))
        .record(&state.pool, &client)
        .await;

    Ok(Json(RevokedSessionsResponse {
        message: format!("Revoked {revoked} session(s)"),
        revoked,
    }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn find_user(state: &AppState, id: DbId) -> AppResult<User> {
    UserRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "User", id }))
}

async fn user_to_response(state: &AppState, user: &User) -> AppResult<UserResponse> {
    let roles = UserRepo::roles_for_user(&state.pool, user.id).await?;
    Ok(UserResponse::new(user, roles))
}

fn ensure_not_self(auth: &AuthUser, id: DbId, applies: bool, verb: &str) -> AppResult<()> {
    if applies && auth.user_id == id {
        return Err(AppError::BadRequest(format!("You cannot {verb} your own account")));
    }
    Ok(())
}

/// Map a guarded repository change onto the API errors.
fn applied<T>(change: GuardedChange<T>, id: DbId) -> AppResult<T> {
    match change {
        GuardedChange::Applied(value) => Ok(value),
        GuardedChange::NotFound => Err(AppError::Core(CoreError::NotFound { entity: "User", id })),
        GuardedChange::LastAdmin => Err(AppError::Core(CoreError::Conflict(
            "The last active administrator cannot be removed".into(),
        ))),
    }
}
