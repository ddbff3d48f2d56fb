//! Request handlers.
//!
//! Each submodule provides the async handler functions for one resource.
//! Handlers check permissions through [`AuthUser`](crate::middleware::auth::AuthUser),
//! delegate persistence to the repositories in `gatekeeper_db`, record an
//! audit entry for every mutation, and map errors via
//! [`AppError`](crate::error::AppError).

pub mod access_requests;
pub mod audit;
pub mod auth;
pub mod groups;
pub mod invitations;
pub mod me;
pub mod permissions;
pub mod policies;
pub mod roles;
pub mod system;
pub mod users;
