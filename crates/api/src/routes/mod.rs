pub mod access_requests;
pub mod audit;
pub mod auth;
pub mod groups;
pub mod health;
pub mod invitations;
pub mod me;
pub mod permissions;
pub mod policies;
pub mod roles;
pub mod system;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /login                                   login (public)
/// /register                                register (public, gated)
/// /logout                                  logout (requires auth)
/// /accept-invitation                       accept invitation (public)
/// /auth/{login,register,signup,logout}     aliases of the above
///
/// /system/status                           bootstrap status (public)
///
/// /iam/users                               list, create
/// /iam/users/{id}                          get, update, delete
/// /iam/users/{id}/status                   activate / deactivate (PUT)
/// /iam/users/{id}/revoke-sessions          force sign-out (POST, admin only)
///
/// /iam/roles                               list, create
/// /iam/roles/{id}                          get, update, delete
///
/// /iam/permissions                         list, create
/// /iam/permissions/{id}                    get, update, delete
///
/// /iam/groups                              list, create
/// /iam/groups/{id}                         get, update, delete
/// /iam/groups/{id}/members                 add member (POST)
/// /iam/groups/{id}/members/{user_id}       remove member (DELETE)
///
/// /iam/policies                            list, create
/// /iam/policies/{id}                       get, update, delete
///
/// /iam/access-requests                     list, create
/// /iam/access-requests/my-requests         caller's requests
/// /iam/access-requests/{id}                get
/// /iam/access-requests/{id}/approve        approve (POST)
/// /iam/access-requests/{id}/reject         reject (POST)
/// /iam/access-requests/{id}/cancel         cancel (POST)
///
/// /iam/audit-logs                          query
/// /iam/audit-logs/export                   export csv / json
/// /iam/activity                            activity feed
///
/// /iam/me                                  current user
/// /iam/me/profile                          update names (PUT)
/// /iam/me/password                         change password (PUT)
/// /iam/me/sessions                         active sessions
/// /iam/me/sessions/{id}/revoke             revoke one (POST)
/// /iam/me/sessions/revoke-all              revoke all others (POST)
/// /iam/me/activity                         own recent activity
///
/// /iam/invitations                         list, create
/// /iam/invitations/{id}                    revoke (DELETE)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .nest("/auth", auth::alias_router())
        .nest("/system", system::router())
        .nest("/iam", iam_routes())
}

fn iam_routes() -> Router<AppState> {
    Router::new()
        .nest("/users", users::router())
        .nest("/roles", roles::router())
        .nest("/permissions", permissions::router())
        .nest("/groups", groups::router())
        .nest("/policies", policies::router())
        .nest("/access-requests", access_requests::router())
        .nest("/audit-logs", audit::router())
        .nest("/activity", audit::activity_router())
        .nest("/me", me::router())
        .nest("/invitations", invitations::router())
}
