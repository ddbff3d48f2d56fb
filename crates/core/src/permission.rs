//! Permission names and wildcard matching.
//!
//! A permission is named `resource:action`. Grants may use `*` in place of the
//! action (`user:*`) or as the whole name (`*`, `*:*`) to cover more than one
//! permission. Required permissions are always concrete.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::CoreError;

/// Wildcard segment accepted in grants.
pub const WILDCARD: &str = "*";

static SEGMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9_-]*$").expect("segment regex is valid"));

// ---------------------------------------------------------------------------
// Well-known permission names
// ---------------------------------------------------------------------------

/// Permission names checked by the API handlers. Seeded by migration.
pub mod names {
    pub const USER_READ: &str = "user:read";
    pub const USER_WRITE: &str = "user:write";
    pub const ROLE_READ: &str = "role:read";
    pub const ROLE_WRITE: &str = "role:write";
    pub const PERMISSION_READ: &str = "permission:read";
    pub const PERMISSION_WRITE: &str = "permission:write";
    pub const GROUP_READ: &str = "group:read";
    pub const GROUP_WRITE: &str = "group:write";
    pub const POLICY_READ: &str = "policy:read";
    pub const POLICY_WRITE: &str = "policy:write";
    pub const REQUEST_APPROVE: &str = "request:approve";
    pub const AUDIT_READ: &str = "audit:read";
    pub const INVITATION_WRITE: &str = "invitation:write";
}

// ---------------------------------------------------------------------------
// PermissionName
// ---------------------------------------------------------------------------

/// A parsed `resource:action` pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PermissionName {
    pub resource: String,
    pub action: String,
}

impl PermissionName {
    /// Parse a permission name, allowing `*` for the action or the whole name.
    pub fn parse(name: &str) -> Result<Self, CoreError> {
        let name = name.trim();
        if name == WILDCARD {
            return Ok(Self {
                resource: WILDCARD.to_string(),
                action: WILDCARD.to_string(),
            });
        }

        let (resource, action) = name.split_once(':').ok_or_else(|| {
            CoreError::Validation(format!(
                "Permission '{name}' must have the form resource:action"
            ))
        })?;

        validate_segment(resource, "resource")?;
        validate_segment(action, "action")?;

        Ok(Self {
            resource: resource.to_string(),
            action: action.to_string(),
        })
    }

    /// Build a concrete name from its parts, validating both.
    pub fn from_parts(resource: &str, action: &str) -> Result<Self, CoreError> {
        Self::parse(&format!("{}:{}", resource.trim(), action.trim()))
    }

    /// Whether this name, used as a grant, covers `required`.
    pub fn covers(&self, required: &PermissionName) -> bool {
        let resource_ok = self.resource == WILDCARD || self.resource == required.resource;
        let action_ok = self.action == WILDCARD || self.action == required.action;
        resource_ok && action_ok
    }
}

impl fmt::Display for PermissionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource, self.action)
    }
}

fn validate_segment(segment: &str, label: &str) -> Result<(), CoreError> {
    if segment == WILDCARD || SEGMENT_RE.is_match(segment) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Permission {label} '{segment}' must be lowercase letters, digits, '_' or '-'"
        )))
    }
}

/// Whether the grant `granted` covers the permission `required`.
///
/// Malformed names never match.
pub fn matches(granted: &str, required: &str) -> bool {
    match (PermissionName::parse(granted), PermissionName::parse(required)) {
        (Ok(g), Ok(r)) => g.covers(&r),
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// PermissionSet
// ---------------------------------------------------------------------------

/// The set of permissions granted to a principal.
#[derive(Debug, Clone, Default)]
pub struct PermissionSet {
    grants: BTreeSet<PermissionName>,
}

impl PermissionSet {
    /// Build a set from raw names. Malformed names are dropped.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let grants = names
            .into_iter()
            .filter_map(|n| PermissionName::parse(n.as_ref()).ok())
            .collect();
        Self { grants }
    }

    /// Whether any grant in the set covers `required`.
    pub fn allows(&self, required: &str) -> bool {
        match PermissionName::parse(required) {
            Ok(r) => self.grants.iter().any(|g| g.covers(&r)),
            Err(_) => false,
        }
    }

    /// Sorted, de-duplicated names for serialization.
    pub fn names(&self) -> Vec<String> {
        self.grants.iter().map(ToString::to_string).collect()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parses_resource_and_action() {
        let p = PermissionName::parse("user:read").unwrap();
        assert_eq!(p.resource, "user");
        assert_eq!(p.action, "read");
        assert_eq!(p.to_string(), "user:read");
    }

    #[test]
    fn rejects_malformed_names() {
        assert_matches!(PermissionName::parse("user"), Err(CoreError::Validation(_)));
        assert_matches!(PermissionName::parse("User:Read"), Err(CoreError::Validation(_)));
        assert_matches!(PermissionName::parse(":read"), Err(CoreError::Validation(_)));
        assert_matches!(PermissionName::parse("user:"), Err(CoreError::Validation(_)));
    }

    #[test]
    fn bare_wildcard_covers_everything() {
        assert!(matches("*", "user:read"));
        assert!(matches("*:*", "policy:write"));
    }

    #[test]
    fn action_wildcard_is_scoped_to_resource() {
        assert!(matches("user:*", "user:write"));
        assert!(!matches("user:*", "role:write"));
    }

    #[test]
    fn concrete_grants_match_exactly() {
        assert!(matches("user:read", "user:read"));
        assert!(!matches("user:read", "user:write"));
        assert!(!matches("garbage", "user:read"));
    }

    #[test]
    fn set_deduplicates_and_drops_malformed() {
        let set = PermissionSet::from_names(["user:read", "user:read", "bad name", "role:*"]);
        assert_eq!(set.names(), vec!["role:*".to_string(), "user:read".to_string()]);
        assert!(set.allows("role:delete"));
        assert!(!set.allows("audit:read"));
    }

    #[test]
    fn from_parts_trims_whitespace() {
        let p = PermissionName::from_parts(" report ", "export").unwrap();
        assert_eq!(p.to_string(), "report:export");
    }
}
