//! Well-known system role names.
//!
//! These must match the seed data in `20260101000002_create_roles.sql`.

use crate::error::CoreError;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_USER: &str = "user";

/// Names of roles that ship with the system.
pub const SYSTEM_ROLES: &[&str] = &[ROLE_ADMIN, ROLE_USER];

/// Reject deletion of a system role.
pub fn ensure_deletable(name: &str, is_system_role: bool) -> Result<(), CoreError> {
    if is_system_role {
        return Err(CoreError::Conflict(format!(
            "System role '{name}' cannot be deleted"
        )));
    }
    Ok(())
}

/// Reject renaming a system role. Same-name updates pass.
pub fn ensure_renamable(
    current: &str,
    new_name: Option<&str>,
    is_system_role: bool,
) -> Result<(), CoreError> {
    match new_name {
        Some(n) if is_system_role && n != current => Err(CoreError::Conflict(format!(
            "System role '{current}' cannot be renamed"
        ))),
        _ => Ok(()),
    }
}

/// Validate a role name for create and rename.
pub fn validate_role_name(name: &str) -> Result<(), CoreError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation("Role name is required".into()));
    }
    if trimmed.chars().count() > 50 {
        return Err(CoreError::Validation(
            "Role name must be at most 50 characters".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn system_roles_cannot_be_deleted() {
        assert_matches!(ensure_deletable("admin", true), Err(CoreError::Conflict(_)));
        assert!(ensure_deletable("auditor", false).is_ok());
    }

    #[test]
    fn system_roles_keep_their_name() {
        assert_matches!(
            ensure_renamable("admin", Some("root"), true),
            Err(CoreError::Conflict(_))
        );
        assert!(ensure_renamable("admin", Some("admin"), true).is_ok());
        assert!(ensure_renamable("admin", None, true).is_ok());
        assert!(ensure_renamable("auditor", Some("reviewer"), false).is_ok());
    }

    #[test]
    fn role_name_bounds() {
        assert!(validate_role_name("auditor").is_ok());
        assert!(validate_role_name("   ").is_err());
        assert!(validate_role_name(&"x".repeat(51)).is_err());
    }

    #[test]
    fn role_name_length_counts_characters() {
        assert!(validate_role_name(&"é".repeat(50)).is_ok());
        assert!(validate_role_name(&"é".repeat(51)).is_err());
    }
}
