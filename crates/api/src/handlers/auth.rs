//! Handlers for credential exchange (login, register, logout, invitation
//! acceptance).

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use gatekeeper_core::audit::{actions, resources};
use gatekeeper_core::error::CoreError;
use gatekeeper_core::invitation;
use gatekeeper_core::policy::SessionPolicy;
use gatekeeper_core::roles::{ROLE_ADMIN, ROLE_USER};
use gatekeeper_core::validation::{clean_optional, normalize_email};
use gatekeeper_db::models::session::CreateSession;
use gatekeeper_db::models::user::{CreateUser, User, UserResponse};
use gatekeeper_db::repositories::{InvitationRepo, RoleRepo, SessionRepo, UserRepo};

use crate::audit::AuditEvent;
use crate::auth::jwt::generate_access_token;
use crate::auth::password::{hash_password, verify_password};
use crate::error::{AppError, AppJson, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::client::ClientInfo;
use crate::policy;
use crate::state::AppState;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    /// Keep the session for the session policy's remember-me duration.
    #[serde(default, alias = "rememberMe")]
    pub remember_me: bool,
}

/// Request body for `POST /register`.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(alias = "firstName")]
    pub first_name: Option<String>,
    #[serde(alias = "lastName")]
    pub last_name: Option<String>,
}

/// Request body for `POST /accept-invitation`.
#[derive(Debug, Deserialize)]
pub struct AcceptInvitationRequest {
    pub token: String,
    pub password: String,
    #[serde(alias = "firstName")]
    pub first_name: Option<String>,
    #[serde(alias = "lastName")]
    pub last_name: Option<String>,
}

/// Successful authentication response.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub user: UserResponse,
}

/// Response for account-creating endpoints.
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: String,
    #[serde(flatten)]
    pub auth: AuthResponse,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/login
///
/// Exchange email and password for an access token. Repeated failures lock
/// the account per the active login policy.
pub async fn login(
    State(state): State<AppState>,
    client: ClientInfo,
    AppJson(input): AppJson<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let email = input.email.trim().to_lowercase();
    if email.is_empty() || input.password.is_empty() {
        return Err(AppError::BadRequest(
            "Email and password are required".into(),
        ));
    }

    let Some(user) = UserRepo::find_by_email(&state.pool, &email).await? else {
        AuditEvent::new(actions::LOGIN_FAILED, resources::AUTH)
            .details(json!({ "email": email, "reason": "unknown_email" }))
            .failed()
            .record(&state.pool, &client)
            .await;
        return Err(AppError::Core(CoreError::Unauthorized(
            INVALID_CREDENTIALS.into(),
        )));
    };

    if !user.is_active {
        login_rejected(&state, &client, &user, "inactive").await;
        return Err(AppError::Core(CoreError::Forbidden(
            "Account is deactivated. Contact an administrator".into(),
        )));
    }

    let now = Utc::now();
    if user.is_locked(now) {
        login_rejected(&state, &client, &user, "locked").await;
        return Err(AppError::Core(CoreError::Forbidden(
            "Account is temporarily locked due to repeated failed logins. Try again later".into(),
        )));
    }

    let valid = verify_password(&input.password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;

    if !valid {
        let attempts = UserRepo::increment_failed_login(&state.pool, user.id).await?;
        let login_policy = policy::login_policy(&state.pool).await?;

        if attempts >= login_policy.max_login_attempts as i32 {
            let until = now + Duration::minutes(i64::from(login_policy.lockout_duration));
            UserRepo::lock_account(&state.pool, user.id, until).await?;
            tracing::warn!(user_id = %user.id, %until, "Account locked after failed logins");
        }

        AuditEvent::new(actions::LOGIN_FAILED, resources::AUTH)
            .by(user.id)
            .resource(user.id)
            .details(json!({ "reason": "bad_password", "attempts": attempts }))
            .failed()
            .record(&state.pool, &client)
            .await;

        return Err(AppError::Core(CoreError::Unauthorized(
            INVALID_CREDENTIALS.into(),
        )));
    }

    UserRepo::record_successful_login(&state.pool, user.id).await?;
    let auth = issue_session(&state, &user, &client, input.remember_me).await?;

    AuditEvent::new(actions::LOGIN, resources::AUTH)
        .by(user.id)
        .resource(user.id)
        .record(&state.pool, &client)
        .await;
    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(auth))
}

/// POST /api/register
///
/// Self-registration. Open while no account exists (the first account
/// becomes an administrator) or when open registration is configured.
pub async fn register(
    State(state): State<AppState>,
    client: ClientInfo,
    AppJson(input): AppJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<RegisterResponse>)> {
    if input.email.trim().is_empty() || input.password.is_empty() {
        return Err(AppError::BadRequest(
            "Email and password are required".into(),
        ));
    }
    let email = normalize_email(&input.email)?;

    let is_first_user = UserRepo::count(&state.pool).await? == 0;
    if !is_first_user && !state.config.allow_open_registration {
        return Err(AppError::Core(CoreError::Forbidden(
            "Registration is closed. Ask an administrator for an invitation".into(),
        )));
    }

    policy::check_new_password(&state.pool, None, &input.password).await?;
    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let role_name = if is_first_user { ROLE_ADMIN } else { ROLE_USER };
    let role_ids: Vec<_> = RoleRepo::find_by_name(&state.pool, role_name)
        .await?
        .map(|r| r.id)
        .into_iter()
        .collect();

    let create = CreateUser {
        email,
        password_hash,
        first_name: clean_optional(input.first_name),
        last_name: clean_optional(input.last_name),
        is_admin: is_first_user,
    };
    let user = UserRepo::create_with_roles(&state.pool, &create, &role_ids, None).await?;

    let auth = issue_session(&state, &user, &client, false).await?;

    AuditEvent::new(actions::REGISTER, resources::USER)
        .by(user.id)
        .resource(user.id)
        .details(json!({ "email": user.email, "is_admin": user.is_admin }))
        .record(&state.pool, &client)
        .await;
    tracing::info!(user_id = %user.id, is_admin = user.is_admin, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "Account created".into(),
            auth,
        }),
    ))
}

/// POST /api/logout
///
/// Revoke the session the presented token belongs to.
pub async fn logout(
    State(state): State<AppState>,
    client: ClientInfo,
    auth: AuthUser,
) -> AppResult<StatusCode> {
    SessionRepo::revoke_for_user(&state.pool, auth.session_id, auth.user_id).await?;

    AuditEvent::new(actions::LOGOUT, resources::AUTH)
        .by(auth.user_id)
        .resource(auth.session_id)
        .record(&state.pool, &client)
        .await;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/accept-invitation
///
/// Create the invited account, grant the invited role and sign the new user in.
pub async fn accept_invitation(
    State(state): State<AppState>,
    client: ClientInfo,
    AppJson(input): AppJson<AcceptInvitationRequest>,
) -> AppResult<(StatusCode, Json<RegisterResponse>)> {
    let invite = InvitationRepo::find_by_token_hash(&state.pool, &invitation::hash_token(&input.token))
        .await?
        .ok_or_else(|| AppError::NotFound("Invitation not found".into()))?;

    invitation::ensure_acceptable(invite.used, invite.expires_at, Utc::now())?;

    policy::check_new_password(&state.pool, None, &input.password).await?;
    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let is_admin = invite.role_name.as_deref() == Some(ROLE_ADMIN);
    let create = CreateUser {
        email: invite.email.clone(),
        password_hash,
        first_name: clean_optional(input.first_name).or(invite.first_name.clone()),
        last_name: clean_optional(input.last_name).or(invite.last_name.clone()),
        is_admin,
    };
    let role_ids: Vec<_> = invite.role_id.into_iter().collect();

    let user =
        UserRepo::create_with_roles(&state.pool, &create, &role_ids, invite.invited_by).await?;

    if !InvitationRepo::mark_used(&state.pool, invite.id).await? {
        tracing::warn!(invitation_id = %invite.id, "Invitation was already marked used");
    }

    let auth = issue_session(&state, &user, &client, false).await?;

    AuditEvent::new(actions::REGISTER, resources::INVITATION)
        .by(user.id)
        .resource(invite.id)
        .details(json!({ "email": user.email, "role_id": invite.role_id }))
        .record(&state.pool, &client)
        .await;
    tracing::info!(user_id = %user.id, invitation_id = %invite.id, "Invitation accepted");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "Invitation accepted".into(),
            auth,
        }),
    ))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Create a session row for `user` and sign an access token bound to it.
///
/// Lifetimes come from the active session policy when there is one, else
/// from the server configuration. The token never outlives its session.
/// Sessions beyond the per-user maximum are revoked, oldest first.
async fn issue_session(
    state: &AppState,
    user: &User,
    client: &ClientInfo,
    remember_me: bool,
) -> AppResult<AuthResponse> {
    let session_policy = policy::session_policy(&state.pool).await?;

    let (token_mins, mut session_days, max_sessions) = match &session_policy {
        Some(p) => (
            i64::from(p.access_token_expiry),
            i64::from(p.refresh_token_expiry),
            p.max_sessions_per_user,
        ),
        None => (
            state.config.jwt.access_token_expiry_mins,
            state.config.session_expiry_days,
            SessionPolicy::default().max_sessions_per_user,
        ),
    };
    if remember_me {
        let remember_days = session_policy
            .as_ref()
            .map(|p| p.remember_me_duration)
            .unwrap_or_else(|| SessionPolicy::default().remember_me_duration);
        session_days = session_days.max(i64::from(remember_days));
    }

    let session_lifetime = Duration::days(session_days);
    let token_mins = token_mins.min(session_lifetime.num_minutes());

    let session = SessionRepo::create(
        &state.pool,
        &CreateSession {
            user_id: user.id,
            expires_at: Utc::now() + session_lifetime,
            user_agent: client.user_agent.clone(),
            ip_address: client.ip_address.clone(),
        },
    )
    .await?;

    let revoked =
        SessionRepo::enforce_max_sessions(&state.pool, user.id, i64::from(max_sessions)).await?;
    if revoked > 0 {
        tracing::debug!(user_id = %user.id, revoked, "Revoked sessions over the per-user limit");
    }

    let token = generate_access_token(user.id, session.id, user.is_admin, token_mins, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    let roles = UserRepo::roles_for_user(&state.pool, user.id).await?;

    Ok(AuthResponse {
        token,
        expires_in: token_mins * 60,
        user: UserResponse::new(user, roles),
    })
}

async fn login_rejected(state: &AppState, client: &ClientInfo, user: &User, reason: &str) {
    AuditEvent::new(actions::LOGIN_FAILED, resources::AUTH)
        .by(user.id)
        .resource(user.id)
        .details(json!({ "reason": reason }))
        .failed()
        .record(&state.pool, client)
        .await;
}
