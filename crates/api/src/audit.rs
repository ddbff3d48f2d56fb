//! Audit trail recording for handlers.
//!
//! Recording is best effort: a failed insert is logged and never fails the
//! request that triggered it.

use serde_json::Value;
use sqlx::PgPool;
use gatekeeper_core::audit::{redact_sensitive_fields, status};
use gatekeeper_core::types::DbId;
use gatekeeper_db::models::audit::CreateAuditLog;
use gatekeeper_db::repositories::AuditLogRepo;

use crate::middleware::client::ClientInfo;

/// One audit entry under construction.
///
/// ```ignore
/// AuditEvent::new(actions::DELETE, resources::ROLE)
///     .by(user.user_id)
///     .resource(role.id)
///     .record(&state.pool, &client)
///     .await;
/// ```
#[derive(Debug)]
pub struct AuditEvent {
    user_id: Option<DbId>,
    action: &'static str,
    resource_type: &'static str,
    resource_id: Option<String>,
    details: Option<Value>,
    status: &'static str,
}

impl AuditEvent {
    pub fn new(action: &'static str, resource_type: &'static str) -> Self {
        Self {
            user_id: None,
            action,
            resource_type,
            resource_id: None,
            details: None,
            status: status::SUCCESS,
        }
    }

    /// The acting user.
    pub fn by(mut self, user_id: DbId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn resource(mut self, id: impl ToString) -> Self {
        self.resource_id = Some(id.to_string());
        self
    }

    /// Attach details. Sensitive fields are redacted before storage.
    pub fn details(mut self, details: Value) -> Self {
        self.details = Some(redact_sensitive_fields(&details));
        self
    }

    pub fn failed(mut self) -> Self {
        self.status = status::FAILURE;
        self
    }

    pub async fn record(self, pool: &PgPool, client: &ClientInfo) {
        let entry = CreateAuditLog {
            user_id: self.user_id,
            action: self.action.to_string(),
            resource_type: Some(self.resource_type.to_string()),
            resource_id: self.resource_id,
            details: self.details,
            status: self.status.to_string(),
            ip_address: client.ip_address.clone(),
            user_agent: client.user_agent.clone(),
        };

        if let Err(e) = AuditLogRepo::insert(pool, &entry).await {
            tracing::warn!(
                error = %e,
                action = self.action,
                resource_type = self.resource_type,
                "Failed to record audit entry"
            );
        }
    }
}
