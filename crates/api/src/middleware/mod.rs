//! Request extractors.
//!
//! - [`auth::AuthUser`] -- Authenticated user from a JWT Bearer token, with
//!   effective permissions loaded.
//! - [`rbac::RequireAdmin`] -- Requires an administrator. [`rbac::ensure_can_grant`]
//!   guards grants of the `admin` role.
//! - [`client::ClientInfo`] -- Client IP and user agent for sessions and audit.

pub mod auth;
pub mod client;
pub mod rbac;
