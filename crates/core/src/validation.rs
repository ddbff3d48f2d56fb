//! Input normalisation shared by account-facing handlers.

use validator::ValidateEmail;

use crate::error::CoreError;

/// Lower-case and trim an email address, rejecting malformed input.
///
/// Emails are stored normalised so uniqueness and login lookups are
/// case-insensitive.
pub fn normalize_email(email: &str) -> Result<String, CoreError> {
    let normalized = email.trim().to_lowercase();
    if normalized.is_empty() {
        return Err(CoreError::Validation("Email is required".into()));
    }
    if !normalized.validate_email() {
        return Err(CoreError::Validation(format!(
            "'{normalized}' is not a valid email address"
        )));
    }
    Ok(normalized)
}

/// Trim an optional name field, mapping blank strings to `None`.
pub fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
