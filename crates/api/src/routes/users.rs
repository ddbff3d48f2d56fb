//! Route definitions for the `/iam/users` resource.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::users;
use crate::state::AppState;

/// Routes mounted at `/iam/users`.
///
/// ```text
/// GET    /                        -> list_users
/// POST   /                        -> create_user
/// GET    /{id}                    -> get_user
/// PUT    /{id}                    -> update_user
/// DELETE /{id}                    -> delete_user
/// PUT    /{id}/status             -> set_user_status
/// POST   /{id}/revoke-sessions    -> revoke_user_sessions (admin only)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(users::list_users).post(users::create_user))
        .route(
            "/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/{id}/status", put(users::set_user_status))
        .route("/{id}/revoke-sessions", post(users::revoke_user_sessions))
}
