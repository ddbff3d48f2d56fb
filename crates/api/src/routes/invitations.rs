//! Route definitions for the `/iam/invitations` resource.

use axum::routing::{delete, get};
use axum::Router;

use crate::handlers::invitations;
use crate::state::AppState;

/// Routes mounted at `/iam/invitations`.
///
/// ```text
/// GET    /      -> list_invitations
/// POST   /      -> create_invitation
/// DELETE /{id}  -> revoke_invitation
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(invitations::list_invitations).post(invitations::create_invitation),
        )
        .route("/{id}", delete(invitations::revoke_invitation))
}
