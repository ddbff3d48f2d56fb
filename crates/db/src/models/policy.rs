//! Security policy entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use gatekeeper_core::types::{DbId, Timestamp};

/// A policy row from the `policies` table.
///
/// `settings` is stored normalised for its `policy_type`; see
/// `gatekeeper_core::policy::PolicySettings`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Policy {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub policy_type: String,
    pub settings: serde_json::Value,
    pub is_active: bool,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a policy.
#[derive(Debug, Deserialize)]
pub struct CreatePolicy {
    pub name: String,
    pub description: Option<String>,
    pub policy_type: String,
    pub settings: serde_json::Value,
    pub is_active: bool,
    pub created_by: Option<DbId>,
}

/// DTO for updating a policy. All fields are optional.
#[derive(Debug, Default, Deserialize)]
pub struct UpdatePolicy {
    pub name: Option<String>,
    pub description: Option<String>,
    pub settings: Option<serde_json::Value>,
    pub is_active: Option<bool>,
}
