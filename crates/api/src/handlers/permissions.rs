//! Handlers for the `/iam/permissions` resource.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use gatekeeper_core::audit::{actions, resources};
use gatekeeper_core::error::CoreError;
use gatekeeper_core::permission::{names, PermissionName};
use gatekeeper_core::types::DbId;
use gatekeeper_core::validation::clean_optional;
use gatekeeper_db::models::permission::{CreatePermission, Permission, UpdatePermission};
use gatekeeper_db::repositories::PermissionRepo;

use crate::audit::AuditEvent;
use crate::error::{AppError, AppJson, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::client::ClientInfo;
use crate::state::AppState;

/// Request body for `POST /iam/permissions`.
///
/// Either `name` or both `resource` and `action` must be given; the missing
/// half is derived from the other.
#[derive(Debug, Deserialize)]
pub struct CreatePermissionRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub resource: Option<String>,
    pub action: Option<String>,
}

/// Request body for `PUT /iam/permissions/{id}`.
#[derive(Debug, Deserialize)]
pub struct UpdatePermissionRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub resource: Option<String>,
    pub action: Option<String>,
}

/// GET /api/iam/permissions
pub async fn list_permissions(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<Vec<Permission>>> {
    auth.require(names::PERMISSION_READ)?;
    Ok(Json(PermissionRepo::list(&state.pool).await?))
}

/// GET /api/iam/permissions/{id}
pub async fn get_permission(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<Permission>> {
    auth.require(names::PERMISSION_READ)?;

    let permission = PermissionRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Permission", id }))?;
    Ok(Json(permission))
}

/// POST /api/iam/permissions
pub async fn create_permission(
    State(state): State<AppState>,
    auth: AuthUser,
    client: ClientInfo,
    AppJson(input): AppJson<CreatePermissionRequest>,
) -> AppResult<(StatusCode, Json<Permission>)> {
    auth.require(names::PERMISSION_WRITE)?;

    let parsed = match (input.name.as_deref(), input.resource.as_deref(), input.action.as_deref()) {
        (Some(name), _, _) => PermissionName::parse(name)?,
        (None, Some(resource), Some(action)) => PermissionName::from_parts(resource, action)?,
        _ => {
            return Err(AppError::BadRequest(
                "Provide a name or both resource and action".into(),
            ))
        }
    };

    let create = CreatePermission {
        name: parsed.to_string(),
        description: clean_optional(input.description),
        resource: parsed.resource,
        action: parsed.action,
    };
    let permission = PermissionRepo::create(&state.pool, &create).await?;

    AuditEvent::new(actions::CREATE, resources::PERMISSION)
        .by(auth.user_id)
        .resource(permission.id)
        .details(json!({ "name": permission.name }))
        .record(&state.pool, &client)
        .await;

    Ok((StatusCode::CREATED, Json(permission)))
}

/// PUT /api/iam/permissions/{id}
///
/// Changing `resource` or `action` without `name` renames the permission to
/// match.
pub async fn update_permission(
    State(state): State<AppState>,
    auth: AuthUser,
    client: ClientInfo,
    Path(id): Path<DbId>,
    AppJson(input): AppJson<UpdatePermissionRequest>,
) -> AppResult<Json<Permission>> {
    auth.require(names::PERMISSION_WRITE)?;

    let existing = PermissionRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Permission", id }))?;

    let parsed = match input.name.as_deref() {
        Some(name) => Some(PermissionName::parse(name)?),
        None if input.resource.is_some() || input.action.is_some() => {
            Some(PermissionName::from_parts(
                input.resource.as_deref().unwrap_or(&existing.resource),
                input.action.as_deref().unwrap_or(&existing.action),
            )?)
        }
        None => None,
    };

    let update = match parsed {
        Some(p) => UpdatePermission {
            name: Some(p.to_string()),
            description: input.description,
            resource: Some(p.resource),
            action: Some(p.action),
        },
        None => UpdatePermission {
            description: input.description,
            ..Default::default()
        },
    };
    let permission = PermissionRepo::update(&state.pool, id, &update)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Permission", id }))?;

    AuditEvent::new(actions::UPDATE, resources::PERMISSION)
        .by(auth.user_id)
        .resource(id)
        .details(json!({ "from": existing.name, "to": permission.name }))
        .record(&state.pool, &client)
        .await;

    Ok(Json(permission))
}

/// DELETE /api/iam/permissions/{id}
///
/// Removes the permission from every role that granted it.
pub async fn delete_permission(
    State(state): State<AppState>,
    auth: AuthUser,
    client: ClientInfo,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    auth.require(names::PERMISSION_WRITE)?;

    if !PermissionRepo::delete(&state.pool, id).await? {
        return Err(AppError::Core(CoreError::NotFound { entity: "Permission", id }));
    }

    AuditEvent::new(actions::DELETE, resources::PERMISSION)
        .by(auth.user_id)
        .resource(id)
        .record(&state.pool, &client)
        .await;

    Ok(StatusCode::NO_CONTENT)
}
