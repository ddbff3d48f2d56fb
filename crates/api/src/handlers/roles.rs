//! Handlers for the `/iam/roles` resource.
//!
//! System roles (`admin`, `user`) can be neither deleted nor renamed, and
//! only administrators may change their description or permissions.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use gatekeeper_core::audit::{actions, resources};
use gatekeeper_core::error::CoreError;
use gatekeeper_core::permission::names;
use gatekeeper_core::roles::{ensure_deletable, ensure_renamable, validate_role_name};
use gatekeeper_core::types::DbId;
use gatekeeper_core::validation::clean_optional;
use gatekeeper_db::models::role::{CreateRole, Role, RoleResponse, UpdateRole};
use gatekeeper_db::repositories::RoleRepo;

use crate::audit::AuditEvent;
use crate::error::{AppError, AppJson, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::client::ClientInfo;
use crate::state::AppState;

/// Request body for `POST /iam/roles`.
#[derive(Debug, Deserialize)]
pub struct CreateRoleRequest {
    pub name: String,
    pub description: Option<String>,
    /// Permission ids granted by the role.
    #[serde(default, alias = "permission_ids")]
    pub permissions: Vec<DbId>,
    #[serde(default, alias = "isSystemRole")]
    pub is_system_role: bool,
}

/// Request body for `PUT /iam/roles/{id}`. `permissions`, when present,
/// replaces the role's permission set.
#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(alias = "permission_ids")]
    pub permissions: Option<Vec<DbId>>,
}

/// GET /api/iam/roles
pub async fn list_roles(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<Vec<RoleResponse>>> {
    auth.require(names::ROLE_READ)?;

    let roles = RoleRepo::list(&state.pool).await?;
    let mut permissions = RoleRepo::permissions_for_all(&state.pool).await?;
    let counts = RoleRepo::user_counts(&state.pool).await?;

    let responses = roles
        .into_iter()
        .map(|role| RoleResponse {
            permissions: permissions.remove(&role.id).unwrap_or_default(),
            user_count: counts.get(&role.id).copied().unwrap_or(0),
            role,
        })
        .collect();

    Ok(Json(responses))
}

/// GET /api/iam/roles/{id}
pub async fn get_role(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<RoleResponse>> {
    auth.require(names::ROLE_READ)?;

    let role = find_role(&state, id).await?;
    Ok(Json(role_to_response(&state, role).await?))
}

/// POST /api/iam/roles
pub async fn create_role(
    State(state): State<AppState>,
    auth: AuthUser,
    client: ClientInfo,
    AppJson(input): AppJson<CreateRoleRequest>,
) -> AppResult<(StatusCode, Json<RoleResponse>)> {
    auth.require(names::ROLE_WRITE)?;
    if input.is_system_role && !auth.is_admin {
        return Err(AppError::Core(CoreError::Forbidden(
            "Only administrators can create system roles".into(),
        )));
    }
    validate_role_name(&input.name)?;

    let create = CreateRole {
        name: input.name.trim().to_string(),
        description: clean_optional(input.description),
        is_system_role: input.is_system_role,
    };
    let role = RoleRepo::create(&state.pool, &create, &input.permissions).await?;

    AuditEvent::new(actions::CREATE, resources::ROLE)
        .by(auth.user_id)
        .resource(role.id)
        .details(json!({ "name": role.name, "permissions": input.permissions }))
        .record(&state.pool, &client)
        .await;

    Ok((StatusCode::CREATED, Json(role_to_response(&state, role).await?)))
}

/// PUT /api/iam/roles/{id}
pub async fn update_role(
    State(state): State<AppState>,
    auth: AuthUser,
    client: ClientInfo,
    Path(id): Path<DbId>,
    AppJson(input): AppJson<UpdateRoleRequest>,
) -> AppResult<Json<RoleResponse>> {
    auth.require(names::ROLE_WRITE)?;

    let existing = find_role(&state, id).await?;
    let name = input.name.as_deref().map(str::trim);
    ensure_renamable(&existing.name, name, existing.is_system_role)?;
    if let Some(name) = name {
        validate_role_name(name)?;
    }
    if existing.is_system_role
        && !auth.is_admin
        && (input.description.is_some() || input.permissions.is_some())
    {
        return Err(AppError::Core(CoreError::Forbidden(
            "Only administrators can modify system roles".into(),
        )));
    }

    let update = UpdateRole {
        name: name.map(str::to_string),
        description: input.description.map(|d| d.trim().to_string()),
    };
    let role = RoleRepo::update(&state.pool, id, &update, input.permissions.as_deref())
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Role", id }))?;

    AuditEvent::new(actions::UPDATE, resources::ROLE)
        .by(auth.user_id)
        .resource(id)
        .details(json!({
            "name": update.name,
            "description": update.description,
            "permissions": input.permissions,
        }))
        .record(&state.pool, &client)
        .await;

    Ok(Json(role_to_response(&state, role).await?))
}

/// DELETE /api/iam/roles/{id}
///
/// System roles are rejected with 409 whoever the caller is.
pub async fn delete_role(
    State(state): State<AppState>,
    auth: AuthUser,
    client: ClientInfo,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    auth.require(names::ROLE_WRITE)?;

    let role = find_role(&state, id).await?;
    ensure_deletable(&role.name, role.is_system_role)?;

    if !RoleRepo::delete(&state.pool, id).await? {
        return Err(AppError::Core(CoreError::NotFound { entity: "Role", id }));
    }

    AuditEvent::new(actions::DELETE, resources::ROLE)
        .by(auth.user_id)
        .resource(id)
        .details(json!({ "name": role.name }))
        .record(&state.pool, &client)
        .await;

    Ok(StatusCode::NO_CONTENT)
}

async fn find_role(state: &AppState, id: DbId) -> AppResult<Role> {
    RoleRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Role", id }))
}

async fn role_to_response(state: &AppState, role: Role) -> AppResult<RoleResponse> {
    let permissions = RoleRepo::permissions_for_role(&state.pool, role.id).await?;
    let user_count = RoleRepo::user_count(&state.pool, role.id).await?;
    Ok(RoleResponse {
        role,
        permissions,
        user_count,
    })
}
