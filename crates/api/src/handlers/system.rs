//! Unauthenticated bootstrap status.

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use gatekeeper_db::repositories::UserRepo;

use crate::error::AppResult;
use crate::state::AppState;

/// Response for `GET /api/system/status`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    /// Whether any account exists. The console shows first-run signup when not.
    pub has_users: bool,
    /// Whether `POST /register` would currently be accepted.
    pub registration_open: bool,
    pub version: &'static str,
}

/// GET /api/system/status
pub async fn status(State(state): State<AppState>) -> AppResult<Json<SystemStatus>> {
    let has_users = UserRepo::count(&state.pool).await? > 0;

    Ok(Json(SystemStatus {
        has_users,
        registration_open: !has_users || state.config.allow_open_registration,
        version: env!("CARGO_PKG_VERSION"),
    }))
}
