//! Route definitions for the `/iam/roles` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::roles;
use crate::state::AppState;

/// Routes mounted at `/iam/roles`.
///
/// ```text
/// GET    /      -> list_roles
/// POST   /      -> create_role
/// GET    /{id}  -> get_role
/// PUT    /{id}  -> update_role
/// DELETE /{id}  -> delete_role
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(roles::list_roles).post(roles::create_role))
        .route(
            "/{id}",
            get(roles::get_role)
                .put(roles::update_role)
                .delete(roles::delete_role),
        )
}
