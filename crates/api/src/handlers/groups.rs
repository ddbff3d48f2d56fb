//! Handlers for the `/iam/groups` resource.
//!
//! Group members inherit the roles assigned to the group, so only
//! administrators may attach the `admin` role to a group or add members to a
//! group that carries it.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use gatekeeper_core::audit::{actions, resources};
use gatekeeper_core::error::CoreError;
use gatekeeper_core::permission::names;
use gatekeeper_core::types::DbId;
use gatekeeper_core::validation::clean_optional;
use gatekeeper_db::models::group::{CreateGroup, Group, GroupResponse, UpdateGroup};
use gatekeeper_db::repositories::GroupRepo;

use crate::audit::AuditEvent;
use crate::error::{AppError, AppJson, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::client::ClientInfo;
use crate::middleware::rbac::ensure_can_grant;
use crate::state::AppState;

/// Request body for `POST /iam/groups`.
#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
    pub description: Option<String>,
    /// Member user ids.
    #[serde(default)]
    pub members: Vec<DbId>,
    /// Role ids inherited by members.
    #[serde(default)]
    pub roles: Vec<DbId>,
}

/// Request body for `PUT /iam/groups/{id}`. Present lists replace the
/// current ones.
#[derive(Debug, Deserialize)]
pub struct UpdateGroupRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub members: Option<Vec<DbId>>,
    pub roles: Option<Vec<DbId>>,
}

/// Request body for `POST /iam/groups/{id}/members`.
#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    #[serde(alias = "userId")]
    pub user_id: DbId,
}

/// GET /api/iam/groups
pub async fn list_groups(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<Vec<GroupResponse>>> {
    auth.require(names::GROUP_READ)?;

    let groups = GroupRepo::list(&state.pool).await?;
    let mut responses = Vec::with_capacity(groups.len());
    for group in groups {
        responses.push(group_to_response(&state, group).await?);
    }
    Ok(Json(responses))
}

/// GET /api/iam/groups/{id}
pub async fn get_group(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<GroupResponse>> {
    auth.require(names::GROUP_READ)?;

    let group = find_group(&state, id).await?;
    Ok(Json(group_to_response(&state, group).await?))
}

/// POST /api/iam/groups
pub async fn create_group(
    State(state): State<AppState>,
    auth: AuthUser,
    client: ClientInfo,
    AppJson(input): AppJson<CreateGroupRequest>,
) -> AppResult<(StatusCode, Json<GroupResponse>)> {
    auth.require(names::GROUP_WRITE)?;

    let name = input.name.trim();
    if name.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Group name is required".into(),
        )));
    }

    ensure_can_grant(&state, &auth, &input.roles).await?;

    let create = CreateGroup {
        name: name.to_string(),
        description: clean_optional(input.description),
    };
    let group = GroupRepo::create(&state.pool, &create, &input.members, &input.roles).await?;

    AuditEvent::new(actions::CREATE, resources::GROUP)
        .by(auth.user_id)
        .resource(group.id)
        .details(json!({
            "name": group.name,
            "members": input.members,
            "roles": input.roles,
        }))
        .record(&state.pool, &client)
        .await;

    Ok((StatusCode::CREATED, Json(group_to_response(&state, group).await?)))
}

/// PUT /api/iam/groups/{id}
pub async fn update_group(
    State(state): State<AppState>,
    auth: AuthUser,
    client: ClientInfo,
    Path(id): Path<DbId>,
    AppJson(input): AppJson<UpdateGroupRequest>,
) -> AppResult<Json<GroupResponse>> {
    auth.require(names::GROUP_WRITE)?;

    let name = input.name.as_deref().map(str::trim);
    if name.is_some_and(str::is_empty) {
        return Err(AppError::Core(CoreError::Validation(
            "Group name cannot be blank".into(),
        )));
    }

    match &input.roles {
        Some(roles) => ensure_can_grant(&state, &auth, roles).await?,
        None if input.members.as_ref().is_some_and(|m| !m.is_empty()) => {
            ensure_group_grantable(&state, &auth, id).await?;
        }
        None => {}
    }

    let update = UpdateGroup {
        name: name.map(str::to_string),
        description: input.description.map(|d| d.trim().to_string()),
    };
    let group = GroupRepo::update(
        &state.pool,
        id,
        &update,
        input.members.as_deref(),
        input.roles.as_deref(),
    )
    .await?
    .ok_or(AppError::Core(CoreError::NotFound { entity: "Group", id }))?;

    AuditEvent::new(actions::UPDATE, resources::GROUP)
        .by(auth.user_id)
        .resource(id)
        .details(json!({
            "name": update.name,
            "members": input.members,
            "roles": input.roles,
        }))
        .record(&state.pool, &client)
        .await;

    Ok(Json(group_to_response(&state, group).await?))
}

/// DELETE /api/iam/groups/{id}
pub async fn delete_group(
    State(state): State<AppState>,
    auth: AuthUser,
    client: ClientInfo,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    auth.require(names::GROUP_WRITE)?;

    if !GroupRepo::delete(&state.pool, id).await? {
        return Err(AppError::Core(CoreError::NotFound { entity: "Group", id }));
    }

    AuditEvent::new(actions::DELETE, resources::GROUP)
        .by(auth.user_id)
        .resource(id)
        .record(&state.pool, &client)
        .await;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/iam/groups/{id}/members
///
/// Idempotent: adding an existing member succeeds.
pub async fn add_member(
    State(state): State<AppState>,
    auth: AuthUser,
    client: ClientInfo,
    Path(id): Path<DbId>,
    AppJson(input): AppJson<AddMemberRequest>,
) -> AppResult<Json<GroupResponse>> {
    auth.require(names::GROUP_WRITE)?;

    let group = find_group(&state, id).await?;
    ensure_group_grantable(&state, &auth, id).await?;
    let added = GroupRepo::add_member(&state.pool, id, input.user_id).await?;

    if added {
        AuditEvent::new(actions::UPDATE, resources::GROUP)
            .by(auth.user_id)
            .resource(id)
            .details(json!({ "added_member": input.user_id }))
            .record(&state.pool, &client)
            .await;
    }

    Ok(Json(group_to_response(&state, group).await?))
}

/// DELETE /api/iam/groups/{id}/members/{user_id}
pub async fn remove_member(
    State(state): State<AppState>,
    auth: AuthUser,
    client: ClientInfo,
    Path((id, user_id)): Path<(DbId, DbId)>,
) -> AppResult<StatusCode> {
    auth.require(names::GROUP_WRITE)?;

    find_group(&state, id).await?;
    if !GroupRepo::remove_member(&state.pool, id, user_id).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Group member",
            id: user_id,
        }));
    }

    AuditEvent::new(actions::UPDATE, resources::GROUP)
        .by(auth.user_id)
        .resource(id)
        .details(json!({ "removed_member": user_id }))
        .record(&state.pool, &client)
        .await;

    Ok(StatusCode::NO_CONTENT)
}

async fn find_group(state: &AppState, id: DbId) -> AppResult<Group> {
    GroupRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Group", id }))
}

/// Joining a group grants its roles.
async fn ensure_group_grantable(state: &AppState, auth: &AuthUser, id: DbId) -> AppResult<()> {
    if auth.is_admin {
        return Ok(());
    }
    let role_ids: Vec<DbId> = GroupRepo::roles(&state.pool, id)
        .await?
        .into_iter()
        .map(|r| r.id)
        .collect();
    ensure_can_grant(state, auth, &role_ids).await
}

async fn group_to_response(state: &AppState, group: Group) -> AppResult<GroupResponse> {
    let members = GroupRepo::members(&state.pool, group.id).await?;
    let roles = GroupRepo::roles(&state.pool, group.id).await?;
    Ok(GroupResponse {
        group,
        members,
        roles,
    })
}
