//! User session model and DTOs.

use serde::Serialize;
use sqlx::FromRow;
use gatekeeper_core::types::{DbId, Timestamp};

/// A user session row from the `user_sessions` table.
///
/// Every issued access token names its session in the `sid` claim; revoking
/// the row invalidates the token.
#[derive(Debug, Clone, FromRow)]
pub struct UserSession {
    pub id: DbId,
    pub user_id: DbId,
    pub expires_at: Timestamp,
    pub is_revoked: bool,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Session as shown on the caller's profile.
#[derive(Debug, Clone, Serialize)]
pub struct SessionResponse {
    pub id: DbId,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
    /// Whether this is the session making the request.
    pub current: bool,
}

impl SessionResponse {
    pub fn new(session: &UserSession, current_id: DbId) -> Self {
        Self {
            id: session.id,
            user_agent: session.user_agent.clone(),
            ip_address: session.ip_address.clone(),
            created_at: session.created_at,
            expires_at: session.expires_at,
            current: session.id == current_id,
        }
    }
}

/// DTO for creating a new user session.
pub struct CreateSession {
    pub user_id: DbId,
    pub expires_at: Timestamp,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}
