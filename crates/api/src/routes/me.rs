//! Route definitions for `/iam/me`.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::me;
use crate::state::AppState;

/// Routes mounted at `/iam/me`.
///
/// ```text
/// GET  /                        -> get_me
/// PUT  /profile                 -> update_profile
/// PUT  /password                -> change_password
/// GET  /sessions                -> list_sessions
/// POST /sessions/revoke-all     -> revoke_other_sessions
/// POST /sessions/{id}/revoke    -> revoke_session
/// GET  /activity                -> my_activity
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(me::get_me))
        .route("/profile", put(me::update_profile))
        .route("/password", put(me::change_password))
        .route("/sessions", get(me::list_sessions))
        .route("/sessions/revoke-all", post(me::revoke_other_sessions))
        .route("/sessions/{id}/revoke", post(me::revoke_session))
        .route("/activity", get(me::my_activity))
}
