//! Route definitions for the `/iam/access-requests` workflow.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::access_requests;
use crate::state::AppState;

/// Routes mounted at `/iam/access-requests`.
///
/// ```text
/// GET  /               -> list_requests
/// POST /               -> create_request
/// GET  /my-requests    -> my_requests
/// GET  /{id}           -> get_request
/// POST /{id}/approve   -> approve_request
/// POST /{id}/reject    -> reject_request
/// POST /{id}/cancel    -> cancel_request
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(access_requests::list_requests).post(access_requests::create_request),
        )
        .route("/my-requests", get(access_requests::my_requests))
        .route("/{id}", get(access_requests::get_request))
        .route("/{id}/approve", post(access_requests::approve_request))
        .route("/{id}/reject", post(access_requests::reject_request))
        .route("/{id}/cancel", post(access_requests::cancel_request))
}
