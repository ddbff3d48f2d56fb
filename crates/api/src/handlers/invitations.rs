//! Handlers for the `/iam/invitations` resource.
//!
//! The plaintext token exists only in the link returned by `POST`; it is not
//! recoverable afterwards.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use gatekeeper_core::audit::{actions, resources};
use gatekeeper_core::error::CoreError;
use gatekeeper_core::invitation;
use gatekeeper_core::permission::names;
use gatekeeper_core::roles::{ROLE_ADMIN, ROLE_USER};
use gatekeeper_core::types::DbId;
use gatekeeper_core::validation::{clean_optional, normalize_email};
use gatekeeper_db::models::invitation::{CreateInvitation, Invitation};
use gatekeeper_db::repositories::{InvitationRepo, RoleRepo, UserRepo};

use crate::audit::AuditEvent;
use crate::error::{AppError, AppJson, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::client::ClientInfo;
use crate::state::AppState;

/// Request body for `POST /iam/invitations`.
#[derive(Debug, Deserialize)]
pub struct CreateInvitationRequest {
    pub email: String,
    #[serde(alias = "firstName")]
    pub first_name: Option<String>,
    #[serde(alias = "lastName")]
    pub last_name: Option<String>,
    /// Role granted on acceptance. Defaults to the `user` role.
    #[serde(alias = "roleId")]
    pub role_id: Option<DbId>,
}

/// Response for `POST /iam/invitations`.
#[derive(Debug, Serialize)]
pub struct InvitationCreatedResponse {
    #[serde(flatten)]
    pub invitation: Invitation,
    pub invitation_link: String,
}

/// GET /api/iam/invitations
///
/// Pending, unexpired invitations.
pub async fn list_invitations(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<Vec<Invitation>>> {
    auth.require(names::INVITATION_WRITE)?;
    Ok(Json(InvitationRepo::list_active(&state.pool).await?))
}

/// POST /api/iam/invitations
pub async fn create_invitation(
    State(state): State<AppState>,
    auth: AuthUser,
    client: ClientInfo,
    AppJson(input): AppJson<CreateInvitationRequest>,
) -> AppResult<(StatusCode, Json<InvitationCreatedResponse>)> {
    auth.require(names::INVITATION_WRITE)?;
    let email = normalize_email(&input.email)?;

    if UserRepo::find_by_email(&state.pool, &email).await?.is_some() {
        return Err(AppError::Core(CoreError::Conflict(
            "A user with this email already exists".into(),
        )));
    }
    if InvitationRepo::find_active_by_email(&state.pool, &email)
        .await?
        .is_some()
    {
        return Err(AppError::Core(CoreError::Conflict(
            "An active invitation for this email already exists".into(),
        )));
    }

    let role = match input.role_id {
        Some(role_id) => RoleRepo::find_by_id(&state.pool, role_id)
            .await?
            .ok_or_else(|| {
                AppError::Core(CoreError::Validation(format!(
                    "Role {role_id} does not exist"
                )))
            })
            .map(Some)?,
        None => RoleRepo::find_by_name(&state.pool, ROLE_USER).await?,
    };
    if role.as_ref().is_some_and(|r| r.name == ROLE_ADMIN) && !auth.is_admin {
        return Err(AppError::Core(CoreError::Forbidden(
            "Only administrators can invite administrators".into(),
        )));
    }

    let token = invitation::generate_token();
    let create = CreateInvitation {
        email,
        first_name: clean_optional(input.first_name),
        last_name: clean_optional(input.last_name),
        token_hash: token.hash,
        role_id: role.map(|r| r.id),
        invited_by: auth.user_id,
        expires_at: Utc::now() + Duration::days(state.config.invitation_expiry_days),
    };
    let created = InvitationRepo::create(&state.pool, &create).await?;

    AuditEvent::new(actions::INVITE, resources::INVITATION)
        .by(auth.user_id)
        .resource(created.id)
        .details(json!({ "email": created.email, "role_id": created.role_id }))
        .record(&state.pool, &client)
        .await;
    tracing::info!(invitation_id = %created.id, invited_by = %auth.user_id, "Invitation created");

    let invitation_link = invitation::invitation_link(&state.config.public_base_url, &token.plaintext);
    Ok((
        StatusCode::CREATED,
        Json(InvitationCreatedResponse {
            invitation: created,
            invitation_link,
        }),
    ))
}

/// DELETE /api/iam/invitations/{id}
///
/// Expire a pending invitation immediately.
pub async fn revoke_invitation(
    State(state): State<AppState>,
    auth: AuthUser,
    client: ClientInfo,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    auth.require(names::INVITATION_WRITE)?;

    if !InvitationRepo::revoke(&state.pool, id).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Invitation",
            id,
        }));
    }

    AuditEvent::new(actions::REVOKE, resources::INVITATION)
        .by(auth.user_id)
        .resource(id)
        .record(&state.pool, &client)
        .await;

    Ok(StatusCode::NO_CONTENT)
}
