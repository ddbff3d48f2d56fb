//! Shared response bodies for API handlers.
//!
//! Resources are returned bare (no envelope). Mutations that have nothing
//! else to return answer with a [`MessageResponse`].

use serde::Serialize;

/// `{ "message": ... }` acknowledgement.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Acknowledgement for bulk session revocation.
#[derive(Debug, Serialize)]
pub struct RevokedSessionsResponse {
    pub message: String,
    /// Number of sessions revoked.
    pub revoked: u64,
}
