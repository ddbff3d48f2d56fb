//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument. Multi-statement writes run
//! inside a transaction opened by the repository method itself.

pub mod access_request_repo;
pub mod audit_repo;
pub mod group_repo;
pub mod invitation_repo;
pub mod password_history_repo;
pub mod permission_repo;
pub mod policy_repo;
pub mod role_repo;
pub mod session_repo;
pub mod user_repo;

pub use access_request_repo::AccessRequestRepo;
pub use audit_repo::AuditLogRepo;
pub use group_repo::GroupRepo;
pub use invitation_repo::InvitationRepo;
pub use password_history_repo::PasswordHistoryRepo;
pub use permission_repo::PermissionRepo;
pub use policy_repo::PolicyRepo;
pub use role_repo::RoleRepo;
pub use session_repo::SessionRepo;
pub use user_repo::UserRepo;
