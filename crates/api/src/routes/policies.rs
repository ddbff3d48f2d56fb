//! Route definitions for the `/iam/policies` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::policies;
use crate::state::AppState;

/// Routes mounted at `/iam/policies`.
///
/// ```text
/// GET    /      -> list_policies
/// POST   /      -> create_policy
/// GET    /{id}  -> get_policy
/// PUT    /{id}  -> update_policy
/// DELETE /{id}  -> delete_policy
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(policies::list_policies).post(policies::create_policy))
        .route(
            "/{id}",
            get(policies::get_policy)
                .put(policies::update_policy)
                .delete(policies::delete_policy),
        )
}
