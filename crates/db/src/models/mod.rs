//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` entity struct matching the database row
//! - A create DTO for inserts
//! - An update DTO (all `Option` fields) for patches

pub mod access_request;
pub mod audit;
pub mod group;
pub mod invitation;
pub mod permission;
pub mod policy;
pub mod role;
pub mod session;
pub mod user;
