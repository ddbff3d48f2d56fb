//! User invitation model and DTOs.

use serde::Serialize;
use sqlx::FromRow;
use gatekeeper_core::types::{DbId, Timestamp};

/// An invitation row joined with role name and inviter email.
///
/// `token_hash` is never serialized.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Invitation {
    pub id: DbId,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(skip_serializing)]
    pub token_hash: String,
    pub role_id: Option<DbId>,
    pub role_name: Option<String>,
    pub invited_by: Option<DbId>,
    pub inviter_email: Option<String>,
    pub used: bool,
    pub expires_at: Timestamp,
    pub created_at: Timestamp,
}

/// DTO for creating an invitation.
pub struct CreateInvitation {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub token_hash: String,
    pub role_id: Option<DbId>,
    pub invited_by: DbId,
    pub expires_at: Timestamp,
}
