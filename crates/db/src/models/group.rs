//! Group entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use gatekeeper_core::types::{DbId, Timestamp};

use crate::models::role::RoleSummary;
use crate::models::user::UserRef;

/// A group row from the `groups` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Group {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Group with resolved members and roles.
#[derive(Debug, Clone, Serialize)]
pub struct GroupResponse {
    #[serde(flatten)]
    pub group: Group,
    pub members: Vec<UserRef>,
    pub roles: Vec<RoleSummary>,
}

/// DTO for creating a group.
#[derive(Debug, Deserialize)]
pub struct CreateGroup {
    pub name: String,
    pub description: Option<String>,
}

/// DTO for updating a group. All fields are optional.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateGroup {
    pub name: Option<String>,
    pub description: Option<String>,
}
