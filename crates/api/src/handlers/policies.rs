//! Handlers for the `/iam/policies` resource.
//!
//! Settings are validated for the policy type and stored with every key
//! present. At most one policy per type is active; activating one
//! deactivates the others of its type.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use gatekeeper_core::audit::{actions, resources};
use gatekeeper_core::error::CoreError;
use gatekeeper_core::permission::names;
use gatekeeper_core::policy::{PolicySettings, PolicyType};
use gatekeeper_core::types::DbId;
use gatekeeper_core::validation::clean_optional;
use gatekeeper_db::models::policy::{CreatePolicy, Policy, UpdatePolicy};
use gatekeeper_db::repositories::PolicyRepo;

use crate::audit::AuditEvent;
use crate::error::{AppError, AppJson, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::client::ClientInfo;
use crate::state::AppState;

/// Request body for `POST /iam/policies`.
#[derive(Debug, Deserialize)]
pub struct CreatePolicyRequest {
    pub name: String,
    pub description: Option<String>,
    #[serde(alias = "type")]
    pub policy_type: String,
    #[serde(default)]
    pub settings: Value,
    /// Defaults to `settings.is_active`, then `true`.
    #[serde(alias = "isActive")]
    pub is_active: Option<bool>,
}

/// Request body for `PUT /iam/policies/{id}`. The type cannot change.
#[derive(Debug, Deserialize)]
pub struct UpdatePolicyRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub settings: Option<Value>,
    #[serde(alias = "isActive")]
    pub is_active: Option<bool>,
}

/// GET /api/iam/policies
pub async fn list_policies(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<Vec<Policy>>> {
    auth.require(names::POLICY_READ)?;
    Ok(Json(PolicyRepo::list(&state.pool).await?))
}

/// GET /api/iam/policies/{id}
pub async fn get_policy(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<Policy>> {
    auth.require(names::POLICY_READ)?;
    Ok(Json(find_policy(&state, id).await?))
}

/// POST /api/iam/policies
pub async fn create_policy(
    State(state): State<AppState>,
    auth: AuthUser,
    client: ClientInfo,
    AppJson(input): AppJson<CreatePolicyRequest>,
) -> AppResult<(StatusCode, Json<Policy>)> {
    auth.require(names::POLICY_WRITE)?;

    let name = input.name.trim();
    if name.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Policy name is required".into(),
        )));
    }
    let policy_type: PolicyType = input.policy_type.trim().parse()?;
    let settings = PolicySettings::parse(policy_type, &input.settings)?;
    let is_active = input
        .is_active
        .or_else(|| embedded_is_active(&input.settings))
        .unwrap_or(true);

    let create = CreatePolicy {
        name: name.to_string(),
        description: clean_optional(input.description),
        policy_type: policy_type.as_str().to_string(),
        settings: settings.to_json(),
        is_active,
        created_by: Some(auth.user_id),
    };
    let policy = PolicyRepo::create(&state.pool, &create).await?;

    AuditEvent::new(actions::CREATE, resources::POLICY)
        .by(auth.user_id)
        .resource(policy.id)
        .details(json!({
            "name": policy.name,
            "policy_type": policy.policy_type,
            "settings": policy.settings,
            "is_active": policy.is_active,
        }))
        .record(&state.pool, &client)
        .await;
    tracing::info!(policy_id = %policy.id, policy_type = %policy_type, is_active, "Policy created");

    Ok((StatusCode::CREATED, Json(policy)))
}

/// PUT /api/iam/policies/{id}
pub async fn update_policy(
    State(state): State<AppState>,
    auth: AuthUser,
    client: ClientInfo,
    Path(id): Path<DbId>,
    AppJson(input): AppJson<UpdatePolicyRequest>,
) -> AppResult<Json<Policy>> {
    auth.require(names::POLICY_WRITE)?;

    let existing = find_policy(&state, id).await?;
    let policy_type: PolicyType = existing.policy_type.parse()?;

    if input.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(AppError::Core(CoreError::Validation(
            "Policy name cannot be blank".into(),
        )));
    }

    let settings = input
        .settings
        .as_ref()
        .map(|raw| PolicySettings::parse(policy_type, raw))
        .transpose()?;
    let is_active = input
        .is_active
        .or_else(|| input.settings.as_ref().and_then(embedded_is_active));

    let update = UpdatePolicy {
        name: input.name,
        description: input.description,
        settings: settings.map(|s| s.to_json()),
        is_active,
    };
    let policy = PolicyRepo::update(&state.pool, id, policy_type.as_str(), &update)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Policy", id }))?;

    AuditEvent::new(actions::UPDATE, resources::POLICY)
        .by(auth.user_id)
        .resource(id)
        .details(json!({
            "name": update.name,
            "settings": update.settings,
            "is_active": update.is_active,
        }))
        .record(&state.pool, &client)
        .await;

    Ok(Json(policy))
}

/// DELETE /api/iam/policies/{id}
///
/// Deleting the active policy of a type reverts enforcement to defaults.
pub async fn delete_policy(
    State(state): State<AppState>,
    auth: AuthUser,
    client: ClientInfo,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    auth.require(names::POLICY_WRITE)?;

    if !PolicyRepo::delete(&state.pool, id).await? {
        return Err(AppError::Core(CoreError::NotFound { entity: "Policy", id }));
    }

    AuditEvent::new(actions::DELETE, resources::POLICY)
        .by(auth.user_id)
        .resource(id)
        .record(&state.pool, &client)
        .await;

    Ok(StatusCode::NO_CONTENT)
}

async fn find_policy(state: &AppState, id: DbId) -> AppResult<Policy> {
    PolicyRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Policy", id }))
}

/// The console sends the active flag inside `settings`.
fn embedded_is_active(settings: &Value) -> Option<bool> {
    settings.get("is_active").and_then(Value::as_bool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_flag_is_read_from_settings() {
        assert_eq!(embedded_is_active(&json!({ "is_active": false })), Some(false));
        assert_eq!(embedded_is_active(&json!({ "min_length": 12 })), None);
        assert_eq!(embedded_is_active(&Value::Null), None);
    }
}
