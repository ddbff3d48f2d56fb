//! Access request entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use gatekeeper_core::types::{DbId, Timestamp};

use crate::models::user::UserRef;

/// An access request row joined with requester, approver, and role names.
#[derive(Debug, Clone, FromRow)]
pub struct AccessRequestRow {
    pub id: DbId,
    pub requester_id: DbId,
    pub requester_email: Option<String>,
    pub requester_first_name: Option<String>,
    pub requester_last_name: Option<String>,
    pub role_id: Option<DbId>,
    pub role_name: Option<String>,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub access_level: String,
    pub justification: String,
    pub is_temporary: bool,
    pub expires_at: Option<Timestamp>,
    pub comments: Option<String>,
    pub status: String,
    pub approver_id: Option<DbId>,
    pub approver_email: Option<String>,
    pub approver_first_name: Option<String>,
    pub approver_last_name: Option<String>,
    pub approver_notes: Option<String>,
    pub decided_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// API representation with nested requester and approver.
#[derive(Debug, Clone, Serialize)]
pub struct AccessRequestResponse {
    pub id: DbId,
    pub requester: UserRef,
    pub role_id: Option<DbId>,
    pub role_name: Option<String>,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub access_level: String,
    pub justification: String,
    pub is_temporary: bool,
    pub expires_at: Option<Timestamp>,
    pub comments: Option<String>,
    pub status: String,
    pub approver: Option<UserRef>,
    pub approver_notes: Option<String>,
    pub approval_date: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<AccessRequestRow> for AccessRequestResponse {
    fn from(row: AccessRequestRow) -> Self {
        let approver = row.approver_id.map(|id| UserRef {
            id,
            email: row.approver_email.clone().unwrap_or_default(),
            first_name: row.approver_first_name.clone(),
            last_name: row.approver_last_name.clone(),
        });

        Self {
            id: row.id,
            requester: UserRef {
                id: row.requester_id,
                email: row.requester_email.unwrap_or_default(),
                first_name: row.requester_first_name,
                last_name: row.requester_last_name,
            },
            role_id: row.role_id,
            role_name: row.role_name,
            resource_type: row.resource_type,
            resource_id: row.resource_id,
            access_level: row.access_level,
            justification: row.justification,
            is_temporary: row.is_temporary,
            expires_at: row.expires_at,
            comments: row.comments,
            status: row.status,
            approver,
            approver_notes: row.approver_notes,
            approval_date: row.decided_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// DTO for creating an access request.
#[derive(Debug, Deserialize)]
pub struct CreateAccessRequest {
    pub requester_id: DbId,
    pub role_id: Option<DbId>,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub access_level: String,
    pub justification: String,
    pub is_temporary: bool,
    pub expires_at: Option<Timestamp>,
    pub comments: Option<String>,
}

/// Filters for listing access requests.
#[derive(Debug, Default, Clone)]
pub struct AccessRequestFilter {
    pub requester_id: Option<DbId>,
    pub status: Option<String>,
    pub resource_type: Option<String>,
}
