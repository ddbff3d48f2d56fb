//! Self-service account endpoints under `/iam/me`.
//!
//! Every handler acts on the authenticated user only; no permission beyond
//! a valid session is required.

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use gatekeeper_core::audit::{actions, resources};
use gatekeeper_core::error::CoreError;
use gatekeeper_core::types::DbId;
use gatekeeper_core::validation::clean_optional;
use gatekeeper_db::models::audit::{AuditLog, AuditQuery};
use gatekeeper_db::models::session::SessionResponse;
use gatekeeper_db::models::user::{UpdateUser, User, UserResponse};
use gatekeeper_db::repositories::{AuditLogRepo, PasswordHistoryRepo, SessionRepo, UserRepo};

use crate::audit::AuditEvent;
use crate::auth::password::{hash_password, verify_password};
use crate::error::{AppError, AppJson, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::client::ClientInfo;
use crate::policy;
use crate::response::{MessageResponse, RevokedSessionsResponse};
use crate::state::AppState;

/// Entries returned by `GET /me/activity` when no limit is given.
const DEFAULT_ACTIVITY_LIMIT: i64 = 20;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Response for `GET /iam/me`.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    /// Effective permission names through direct and group roles.
    pub permissions: Vec<String>,
    /// The password is older than the password policy allows.
    pub password_expired: bool,
}

/// Request body for `PUT /iam/me/profile`.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(alias = "firstName")]
    pub first_name: Option<String>,
    #[serde(alias = "lastName")]
    pub last_name: Option<String>,
}

/// Request body for `PUT /iam/me/password`.
#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(alias = "currentPassword")]
    pub current_password: String,
    #[serde(alias = "newPassword")]
    pub new_password: String,
}

/// Query parameters for `GET /iam/me/activity`.
#[derive(Debug, Deserialize)]
pub struct MyActivityParams {
    pub limit: Option<i64>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/iam/me
pub async fn get_me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<MeResponse>> {
    let user = current_user(&state, &auth).await?;
    let roles = UserRepo::roles_for_user(&state.pool, user.id).await?;
    let password_policy = policy::password_policy(&state.pool).await?;

    Ok(Json(MeResponse {
        password_expired: password_policy.is_expired(user.password_changed_at, Utc::now()),
        permissions: auth.permissions.names(),
        user: UserResponse::new(&user, roles),
    }))
}

/// PUT /api/iam/me/profile
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    client: ClientInfo,
    AppJson(input): AppJson<UpdateProfileRequest>,
) -> AppResult<Json<UserResponse>> {
    let update = UpdateUser {
        first_name: clean_optional(input.first_name),
        last_name: clean_optional(input.last_name),
        ..Default::default()
    };
    let user = UserRepo::update(&state.pool, auth.user_id, &update)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "User",
            id: auth.user_id,
        }))?;

    AuditEvent::new(actions::UPDATE, resources::USER)
        .by(auth.user_id)
        .resource(auth.user_id)
        .details(json!({ "first_name": update.first_name, "last_name": update.last_name }))
        .record(&state.pool, &client)
        .await;

    let roles = UserRepo::roles_for_user(&state.pool, user.id).await?;
    Ok(Json(UserResponse::new(&user, roles)))
}

/// PUT /api/iam/me/password
///
/// Requires the current password. On success every other session of the
/// user is revoked; the session making the call stays valid.
pub async fn change_password(
    State(state): State<AppState>,
    auth: AuthUser,
    client: ClientInfo,
    AppJson(input): AppJson<ChangePasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    let user = current_user(&state, &auth).await?;

    let valid = verify_password(&input.current_password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !valid {
        AuditEvent::new(actions::PASSWORD_CHANGE, resources::USER)
            .by(auth.user_id)
            .resource(auth.user_id)
            .details(json!({ "reason": "wrong_current_password" }))
            .failed()
            .record(&state.pool, &client)
            .await;
        return Err(AppError::BadRequest("Current password is incorrect".into()));
    }
    if input.new_password == input.current_password {
        return Err(AppError::Core(CoreError::Validation(
            "New password must differ from the current password".into(),
        )));
    }

    let applied = policy::check_new_password(&state.pool, Some(user.id), &input.new_password).await?;
    let password_hash = hash_password(&input.new_password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    UserRepo::update_password(&state.pool, user.id, &password_hash).await?;
    PasswordHistoryRepo::prune(
        &state.pool,
        user.id,
        i64::from(applied.password_history.max(1)),
    )
    .await?;
    let revoked = SessionRepo::revoke_all_except(&state.pool, user.id, auth.session_id).await?;

    AuditEvent::new(actions::PASSWORD_CHANGE, resources::USER)
        .by(auth.user_id)
        .resource(auth.user_id)
        .details(json!({ "revoked_sessions": revoked }))
        .record(&state.pool, &client)
        .await;
    tracing::info!(user_id = %user.id, revoked, "Password changed");

    Ok(Json(MessageResponse::new("Password updated")))
}

/// GET /api/iam/me/sessions
pub async fn list_sessions(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<Vec<SessionResponse>>> {
    let sessions = SessionRepo::list_active_for_user(&state.pool, auth.user_id).await?;
    Ok(Json(
        sessions
            .iter()
            .map(|s| SessionResponse::new(s, auth.session_id))
            .collect(),
    ))
}

/// POST /api/iam/me/sessions/{id}/revoke
///
/// Revoking the current session signs the caller out.
pub async fn revoke_session(
    State(state): State<AppState>,
    auth: AuthUser,
    client: ClientInfo,
    Path(id): Path<DbId>,
) -> AppResult<Json<MessageResponse>> {
    if !SessionRepo::revoke_for_user(&state.pool, id, auth.user_id).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Session",
            id,
        }));
    }

    AuditEvent::new(actions::REVOKE, resources::SESSION)
        .by(auth.user_id)
        .resource(id)
        .record(&state.pool, &client)
        .await;

    Ok(Json(MessageResponse::new("Session revoked")))
}

/// POST /api/iam/me/sessions/revoke-all
///
/// Revoke every session except the current one.
pub async fn revoke_other_sessions(
    State(state): State<AppState>,
    auth: AuthUser,
    client: ClientInfo,
) -> AppResult<Json<RevokedSessionsResponse>> {
    let revoked = SessionRepo::revoke_all_except(&state.pool, auth.user_id, auth.session_id).await?;

    AuditEvent::new(actions::REVOKE, resources::SESSION)
        .by(auth.user_id)
        .resource(auth.user_id)
        .details(json!({ "revoked": revoked, "kept": auth.session_id }))
        .record(&state.pool, &client)
        .await;

    Ok(Json(RevokedSessionsResponse {
        message: format!("Revoked {revoked} other session(s)"),
        revoked,
    }))
}

/// GET /api/iam/me/activity
pub async fn my_activity(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<MyActivityParams>,
) -> AppResult<Json<Vec<AuditLog>>> {
    let query = AuditQuery {
        user_id: Some(auth.user_id),
        limit: Some(params.limit.unwrap_or(DEFAULT_ACTIVITY_LIMIT)),
        ..Default::default()
    };
    Ok(Json(AuditLogRepo::query(&state.pool, &query).await?))
}

async fn current_user(state: &AppState, auth: &AuthUser) -> AppResult<User> {
    UserRepo::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "User",
            id: auth.user_id,
        }))
}
