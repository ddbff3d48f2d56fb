//! Route definitions for credential exchange.

use axum::routing::post;
use axum::Router;

use crate::handlers::auth;
use crate::state::AppState;

/// Routes mounted at the API root.
///
/// ```text
/// POST /login              -> login
/// POST /register           -> register
/// POST /logout             -> logout (requires auth)
/// POST /accept-invitation  -> accept_invitation
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .route("/logout", post(auth::logout))
        .route("/accept-invitation", post(auth::accept_invitation))
}

/// Aliases mounted at `/auth` for clients that namespace authentication.
///
/// ```text
/// POST /login     -> login
/// POST /register  -> register
/// POST /signup    -> register
/// POST /logout    -> logout (requires auth)
/// ```
pub fn alias_router() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .route("/signup", post(auth::register))
        .route("/logout", post(auth::logout))
}
