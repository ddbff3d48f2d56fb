//! Route definitions for `/system`.

use axum::routing::get;
use axum::Router;

use crate::handlers::system;
use crate::state::AppState;

/// Routes mounted at `/system`.
///
/// ```text
/// GET /status  -> status (public)
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/status", get(system::status))
}
