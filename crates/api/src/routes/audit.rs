//! Route definitions for the audit trail and activity feed.

use axum::routing::get;
use axum::Router;

use crate::handlers::audit;
use crate::state::AppState;

/// Routes mounted at `/iam/audit-logs`.
///
/// ```text
/// GET /         -> query_audit_logs
/// GET /export   -> export_audit_logs
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(audit::query_audit_logs))
        .route("/export", get(audit::export_audit_logs))
}

/// Routes mounted at `/iam/activity`.
///
/// ```text
/// GET /  -> activity
/// ```
pub fn activity_router() -> Router<AppState> {
    Router::new().route("/", get(audit::activity))
}
