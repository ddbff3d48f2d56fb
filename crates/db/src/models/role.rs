//! Role entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use gatekeeper_core::types::{DbId, Timestamp};

use crate::models::permission::Permission;

/// A role row from the `roles` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Role {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub is_system_role: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Role reference embedded in user and group responses.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RoleSummary {
    pub id: DbId,
    pub name: String,
    pub is_system_role: bool,
    /// Set for temporary grants.
    pub expires_at: Option<Timestamp>,
}

/// A role assignment joined with its owner, for bulk prefetching.
#[derive(Debug, Clone, FromRow)]
pub struct UserRoleRow {
    pub user_id: DbId,
    pub id: DbId,
    pub name: String,
    pub is_system_role: bool,
    pub expires_at: Option<Timestamp>,
}

impl From<UserRoleRow> for RoleSummary {
    fn from(row: UserRoleRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            is_system_role: row.is_system_role,
            expires_at: row.expires_at,
        }
    }
}

/// Role with its permissions and assignment count.
#[derive(Debug, Clone, Serialize)]
pub struct RoleResponse {
    #[serde(flatten)]
    pub role: Role,
    pub permissions: Vec<Permission>,
    pub user_count: i64,
}

/// DTO for creating a new role.
#[derive(Debug, Deserialize)]
pub struct CreateRole {
    pub name: String,
    pub description: Option<String>,
    pub is_system_role: bool,
}

/// DTO for updating an existing role. All fields are optional.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateRole {
    pub name: Option<String>,
    pub description: Option<String>,
}
