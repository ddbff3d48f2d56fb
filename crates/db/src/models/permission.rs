//! Permission entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use gatekeeper_core::types::{DbId, Timestamp};

/// A permission row from the `permissions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Permission {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub resource: String,
    pub action: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A permission joined with the role that carries it.
#[derive(Debug, Clone, FromRow)]
pub struct RolePermissionRow {
    pub role_id: DbId,
    #[sqlx(flatten)]
    pub permission: Permission,
}

/// DTO for creating a permission. `name` is always `resource:action` form.
#[derive(Debug, Deserialize)]
pub struct CreatePermission {
    pub name: String,
    pub description: Option<String>,
    pub resource: String,
    pub action: String,
}

/// DTO for updating a permission. All fields are optional.
#[derive(Debug, Default, Deserialize)]
pub struct UpdatePermission {
    pub name: Option<String>,
    pub description: Option<String>,
    pub resource: Option<String>,
    pub action: Option<String>,
}
