//! Gatekeeper domain logic.
//!
//! Everything in this crate is free of IO so it can be shared by the
//! repository layer, the HTTP server, and tests.

pub mod access_request;
pub mod audit;
pub mod error;
pub mod hashing;
pub mod invitation;
pub mod permission;
pub mod policy;
pub mod roles;
pub mod types;
pub mod validation;
