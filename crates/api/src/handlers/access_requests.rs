//! Handlers for the `/iam/access-requests` workflow.
//!
//! Any authenticated user may request access. Holders of `request:approve`
//! see and decide every request; everyone else sees only their own.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use gatekeeper_core::access_request::{
    self, AccessRequestStatus, Actor, Decision, RESOURCE_TYPE_ROLE,
};
use gatekeeper_core::audit::{actions, resources};
use gatekeeper_core::error::CoreError;
use gatekeeper_core::permission::names;
use gatekeeper_core::types::{DbId, Timestamp};
use gatekeeper_core::validation::clean_optional;
use gatekeeper_db::models::access_request::{
    AccessRequestFilter, AccessRequestResponse, AccessRequestRow, CreateAccessRequest,
};
use gatekeeper_db::repositories::{AccessRequestRepo, RoleRepo};

use crate::audit::AuditEvent;
use crate::error::{AppError, AppJson, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::client::ClientInfo;
use crate::middleware::rbac::ensure_can_grant;
use crate::state::AppState;

/// Access level recorded when the request does not name one.
const DEFAULT_ACCESS_LEVEL: &str = "read";

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Query parameters for `GET /iam/access-requests`.
#[derive(Debug, Default, Deserialize)]
pub struct ListAccessRequestsParams {
    pub status: Option<String>,
    pub resource_type: Option<String>,
}

/// Request body for `POST /iam/access-requests`.
#[derive(Debug, Deserialize)]
pub struct CreateAccessRequestBody {
    #[serde(alias = "resourceType")]
    pub resource_type: Option<String>,
    #[serde(alias = "resourceId")]
    pub resource_id: Option<String>,
    #[serde(alias = "roleId")]
    pub role_id: Option<DbId>,
    #[serde(alias = "accessLevel")]
    pub access_level: Option<String>,
    #[serde(default)]
    pub justification: String,
    #[serde(default, alias = "isTemporary")]
    pub is_temporary: bool,
    #[serde(alias = "expiresAt")]
    pub expires_at: Option<Timestamp>,
    pub comments: Option<String>,
}

/// Optional body for approve / reject / cancel.
#[derive(Debug, Default, Deserialize)]
pub struct DecisionBody {
    #[serde(alias = "comments")]
    pub notes: Option<String>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/iam/access-requests
pub async fn list_requests(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<ListAccessRequestsParams>,
) -> AppResult<Json<Vec<AccessRequestResponse>>> {
    let status = params
        .status
        .as_deref()
        .filter(|s| !s.is_empty() && *s != "all")
        .map(str::parse::<AccessRequestStatus>)
        .transpose()?;

    let filter = AccessRequestFilter {
        requester_id: (!auth.can(names::REQUEST_APPROVE)).then_some(auth.user_id),
        status: status.map(|s| s.as_str().to_string()),
        resource_type: clean_optional(params.resource_type),
    };
    let rows = AccessRequestRepo::list(&state.pool, &filter).await?;

    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

/// GET /api/iam/access-requests/my-requests
pub async fn my_requests(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<Vec<AccessRequestResponse>>> {
    let filter = AccessRequestFilter {
        requester_id: Some(auth.user_id),
        ..Default::default()
    };
    let rows = AccessRequestRepo::list(&state.pool, &filter).await?;

    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

/// GET /api/iam/access-requests/{id}
pub async fn get_request(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<AccessRequestResponse>> {
    let row = find_request(&state, id).await?;
    auth.require_self_or(row.requester_id, names::REQUEST_APPROVE)?;

    Ok(Json(row.into()))
}

/// POST /api/iam/access-requests
///
/// Naming a `role_id` makes this a role grant request; approval then grants
/// the role to the requester.
pub async fn create_request(
    State(state): State<AppState>,
    auth: AuthUser,
    client: ClientInfo,
    AppJson(input): AppJson<CreateAccessRequestBody>,
) -> AppResult<(StatusCode, Json<AccessRequestResponse>)> {
    access_request::validate_justification(&input.justification)?;
    access_request::validate_duration(input.is_temporary, input.expires_at)?;

    if let Some(role_id) = input.role_id {
        if RoleRepo::find_by_id(&state.pool, role_id).await?.is_none() {
            return Err(AppError::Core(CoreError::Validation(format!(
                "Role {role_id} does not exist"
            ))));
        }
    }

    let resource_type = match (clean_optional(input.resource_type), input.role_id) {
        (Some(rt), _) => rt,
        (None, Some(_)) => RESOURCE_TYPE_ROLE.to_string(),
        (None, None) => {
            return Err(AppError::Core(CoreError::Validation(
                "resource_type is required when no role is requested".into(),
            )))
        }
    };
    let resource_id = clean_optional(input.resource_id).or(input.role_id.map(|id| id.to_string()));

    let create = CreateAccessRequest {
        requester_id: auth.user_id,
        role_id: input.role_id,
        resource_type,
        resource_id,
        access_level: clean_optional(input.access_level)
            .unwrap_or_else(|| DEFAULT_ACCESS_LEVEL.to_string()),
        justification: input.justification,
        is_temporary: input.is_temporary,
        expires_at: input.expires_at,
        comments: clean_optional(input.comments),
    };
    let row = AccessRequestRepo::create(&state.pool, &create).await?;

    AuditEvent::new(actions::CREATE, resources::ACCESS_REQUEST)
        .by(auth.user_id)
        .resource(row.id)
        .details(json!({
            "resource_type": row.resource_type,
            "resource_id": row.resource_id,
            "role_id": row.role_id,
            "is_temporary": row.is_temporary,
        }))
        .record(&state.pool, &client)
        .await;
    tracing::info!(request_id = %row.id, requester = %auth.user_id, "Access request created");

    Ok((StatusCode::CREATED, Json(row.into())))
}

/// POST /api/iam/access-requests/{id}/approve
pub async fn approve_request(
    State(state): State<AppState>,
    auth: AuthUser,
    client: ClientInfo,
    Path(id): Path<DbId>,
    body: Option<Json<DecisionBody>>,
) -> AppResult<Json<AccessRequestResponse>> {
    decide(&state, &auth, &client, id, Decision::Approve, body).await
}

/// POST /api/iam/access-requests/{id}/reject
pub async fn reject_request(
    State(state): State<AppState>,
    auth: AuthUser,
    client: ClientInfo,
    Path(id): Path<DbId>,
    body: Option<Json<DecisionBody>>,
) -> AppResult<Json<AccessRequestResponse>> {
    decide(&state, &auth, &client, id, Decision::Reject, body).await
}

/// POST /api/iam/access-requests/{id}/cancel
pub async fn cancel_request(
    State(state): State<AppState>,
    auth: AuthUser,
    client: ClientInfo,
    Path(id): Path<DbId>,
    body: Option<Json<DecisionBody>>,
) -> AppResult<Json<AccessRequestResponse>> {
    decide(&state, &auth, &client, id, Decision::Cancel, body).await
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn find_request(state: &AppState, id: DbId) -> AppResult<AccessRequestRow> {
    AccessRequestRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "AccessRequest",
            id,
        }))
}

async fn decide(
    state: &AppState,
    auth: &AuthUser,
    client: &ClientInfo,
    id: DbId,
    decision: Decision,
    body: Option<Json<DecisionBody>>,
) -> AppResult<Json<AccessRequestResponse>> {
    let notes = body.and_then(|Json(b)| clean_optional(b.notes));
    let row = find_request(state, id).await?;

    let current: AccessRequestStatus = row.status.parse()?;
    let actor = Actor {
        user_id: auth.user_id,
        is_admin: auth.is_admin,
        can_approve: auth.can(names::REQUEST_APPROVE),
    };
    let target = access_request::transition(current, decision, row.requester_id, actor)?;

    if decision == Decision::Approve
        && row.is_temporary
        && row.expires_at.is_some_and(|at| at <= Utc::now())
    {
        return Err(AppError::Core(CoreError::Validation(
            "The requested access period has already ended".into(),
        )));
    }
    if decision == Decision::Approve {
        if let Some(role_id) = row.role_id {
            ensure_can_grant(state, auth, &[role_id]).await?;
        }
    }

    let updated = AccessRequestRepo::decide(&state.pool, id, target, auth.user_id, notes.as_deref())
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Conflict(
                "Request was decided by someone else in the meantime".into(),
            ))
        })?;

    let action = match decision {
        Decision::Approve => actions::APPROVE,
        Decision::Reject => actions::REJECT,
        Decision::Cancel => actions::CANCEL,
    };
    AuditEvent::new(action, resources::ACCESS_REQUEST)
        .by(auth.user_id)
        .resource(id)
        .details(json!({
            "requester_id": updated.requester_id,
            "role_id": updated.role_id,
            "notes": notes,
        }))
        .record(&state.pool, client)
        .await;
    tracing::info!(request_id = %id, status = %target, decided_by = %auth.user_id, "Access request decided");

    Ok(Json(updated.into()))
}
