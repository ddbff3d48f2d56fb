//! Route definitions for the `/iam/groups` resource.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::groups;
use crate::state::AppState;

/// Routes mounted at `/iam/groups`.
///
/// ```text
/// GET    /                         -> list_groups
/// POST   /                         -> create_group
/// GET    /{id}                     -> get_group
/// PUT    /{id}                     -> update_group
/// DELETE /{id}                     -> delete_group
/// POST   /{id}/members             -> add_member
/// DELETE /{id}/members/{user_id}   -> remove_member
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(groups::list_groups).post(groups::create_group))
        .route(
            "/{id}",
            get(groups::get_group)
                .put(groups::update_group)
                .delete(groups::delete_group),
        )
        .route("/{id}/members", post(groups::add_member))
        .route("/{id}/members/{user_id}", delete(groups::remove_member))
}
