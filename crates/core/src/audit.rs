//! Audit logging constants and utility functions.

// ---------------------------------------------------------------------------
// Action constants
// ---------------------------------------------------------------------------

/// Known actions recorded in `audit_logs.action`.
pub mod actions {
    pub const LOGIN: &str = "login";
    pub const LOGIN_FAILED: &str = "login_failed";
    pub const LOGOUT: &str = "logout";
    pub const REGISTER: &str = "register";
    pub const CREATE: &str = "create";
    pub const UPDATE: &str = "update";
    pub const DELETE: &str = "delete";
    pub const APPROVE: &str = "approve";
    pub const REJECT: &str = "reject";
    pub const CANCEL: &str = "cancel";
    pub const INVITE: &str = "invite";
    pub const REVOKE: &str = "revoke";
    pub const PASSWORD_CHANGE: &str = "password_change";
}

/// Resource types recorded in `audit_logs.resource_type`.
pub mod resources {
    pub const AUTH: &str = "auth";
    pub const USER: &str = "user";
    pub const ROLE: &str = "role";
    pub const PERMISSION: &str = "permission";
    pub const GROUP: &str = "group";
    pub const POLICY: &str = "policy";
    pub const ACCESS_REQUEST: &str = "access_request";
    pub const SESSION: &str = "session";
    pub const INVITATION: &str = "user_invitation";
}

/// Outcome recorded in `audit_logs.status`.
pub mod status {
    pub const SUCCESS: &str = "success";
    pub const FAILURE: &str = "failure";
}

// ---------------------------------------------------------------------------
// Sensitive field redaction
// ---------------------------------------------------------------------------

/// Fields that should be redacted from audit log details before storage.
pub const SENSITIVE_FIELDS: &[&str] = &[
    "password",
    "token",
    "secret",
    "api_key",
    "private_key",
    "authorization",
    "credential",
];

/// Redact sensitive fields from a JSON value.
///
/// Replaces the value of any key containing one of [`SENSITIVE_FIELDS`]
/// (case-insensitive) with `"[REDACTED]"`, descending into nested objects and
/// arrays.
pub fn redact_sensitive_fields(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut redacted = serde_json::Map::new();
            for (key, val) in map {
                let lower_key = key.to_lowercase();
                if SENSITIVE_FIELDS.iter().any(|f| lower_key.contains(f)) {
                    redacted.insert(
                        key.clone(),
                        serde_json::Value::String("[REDACTED]".to_string()),
                    );
                } else {
                    redacted.insert(key.clone(), redact_sensitive_fields(val));
                }
            }
            serde_json::Value::Object(redacted)
        }
        serde_json::Value::Array(arr) => {
            serde_json::Value::Array(arr.iter().map(redact_sensitive_fields).collect())
        }
        other => other.clone(),
    }
}

/// Quote a field for CSV export when it contains a delimiter, quote or newline.
pub fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn redacts_nested_secrets() {
        let input = json!({
            "email": "a@b.io",
            "new_password": "hunter2",
            "meta": { "Refresh_Token": "abc", "note": "ok" },
            "items": [{ "client_secret": "x" }]
        });
        let out = redact_sensitive_fields(&input);
        assert_eq!(out["email"], "a@b.io");
        assert_eq!(out["new_password"], "[REDACTED]");
        assert_eq!(out["meta"]["Refresh_Token"], "[REDACTED]");
        assert_eq!(out["meta"]["note"], "ok");
        assert_eq!(out["items"][0]["client_secret"], "[REDACTED]");
    }

    #[test]
    fn csv_quoting() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
