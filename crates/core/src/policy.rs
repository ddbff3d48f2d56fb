//! Security policy types, settings validation, and password rules.
//!
//! A policy row stores its `settings` as JSON. The shape of that JSON depends
//! on the policy type; [`PolicySettings::parse`] validates it and fills in
//! defaults so the stored value is always complete.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Timestamp;

/// Key the dashboard sends inside `settings`. It lives on the policy row.
const IS_ACTIVE_KEY: &str = "is_active";

// ---------------------------------------------------------------------------
// Policy type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyType {
    Password,
    Session,
    Mfa,
    Login,
}

impl PolicyType {
    pub const ALL: [PolicyType; 4] = [Self::Password, Self::Session, Self::Mfa, Self::Login];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Password => "password",
            Self::Session => "session",
            Self::Mfa => "mfa",
            Self::Login => "login",
        }
    }
}

impl fmt::Display for PolicyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "password" => Ok(Self::Password),
            "session" => Ok(Self::Session),
            "mfa" => Ok(Self::Mfa),
            "login" => Ok(Self::Login),
            other => Err(CoreError::Validation(format!(
                "Unknown policy type '{other}' (expected password, session, mfa or login)"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Settings structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PasswordPolicy {
    pub min_length: u32,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_numbers: bool,
    pub require_special_chars: bool,
    /// Number of previous passwords that may not be reused. 0 disables.
    pub password_history: u32,
    /// Days until a password must be changed. 0 disables.
    pub expiry_days: u32,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            require_uppercase: true,
            require_lowercase: true,
            require_numbers: true,
            require_special_chars: true,
            password_history: 5,
            expiry_days: 90,
        }
    }
}

impl PasswordPolicy {
    /// Check a candidate password, returning every rule it violates.
    pub fn check(&self, password: &str) -> Result<(), Vec<String>> {
        let mut violations = Vec::new();

        if password.chars().count() < self.min_length as usize {
            violations.push(format!(
                "Password must be at least {} characters long",
                self.min_length
            ));
        }
        if self.require_uppercase && !password.chars().any(char::is_uppercase) {
            violations.push("Password must contain an uppercase letter".to_string());
        }
        if self.require_lowercase && !password.chars().any(char::is_lowercase) {
            violations.push("Password must contain a lowercase letter".to_string());
        }
        if self.require_numbers && !password.chars().any(|c| c.is_ascii_digit()) {
            violations.push("Password must contain a number".to_string());
        }
        if self.require_special_chars && password.chars().all(char::is_alphanumeric) {
            violations.push("Password must contain a special character".to_string());
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }

    /// Like [`check`](Self::check) but folded into a single validation error.
    pub fn enforce(&self, password: &str) -> Result<(), CoreError> {
        self.check(password)
            .map_err(|v| CoreError::Validation(v.join("; ")))
    }

    /// Whether a password last changed at `changed_at` has expired at `now`.
    pub fn is_expired(&self, changed_at: Timestamp, now: Timestamp) -> bool {
        self.expiry_days > 0
            && now - changed_at > chrono::Duration::days(i64::from(self.expiry_days))
    }

    fn validate(&self) -> Result<(), CoreError> {
        check_range("min_length", self.min_length, 4, 128)?;
        check_range("password_history", self.password_history, 0, 24)?;
        check_range("expiry_days", self.expiry_days, 0, 3650)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionPolicy {
    /// Idle timeout in minutes.
    pub session_timeout: u32,
    pub max_sessions_per_user: u32,
    /// Server-side session lifetime in days.
    pub refresh_token_expiry: u32,
    /// Access token lifetime in minutes.
    pub access_token_expiry: u32,
    /// Days.
    pub remember_me_duration: u32,
    pub ip_binding: bool,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            session_timeout: 60,
            max_sessions_per_user: 5,
            refresh_token_expiry: 7,
            access_token_expiry: 60,
            remember_me_duration: 30,
            ip_binding: false,
        }
    }
}

impl SessionPolicy {
    fn validate(&self) -> Result<(), CoreError> {
        check_range("session_timeout", self.session_timeout, 1, 10_080)?;
        check_range("max_sessions_per_user", self.max_sessions_per_user, 1, 100)?;
        check_range("refresh_token_expiry", self.refresh_token_expiry, 1, 365)?;
        check_range("access_token_expiry", self.access_token_expiry, 1, 10_080)?;
        check_range("remember_me_duration", self.remember_me_duration, 0, 365)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MfaPolicy {
    pub require_for_admins: bool,
    pub require_for_all_users: bool,
    pub remember_device_days: u32,
}

impl Default for MfaPolicy {
    fn default() -> Self {
        Self {
            require_for_admins: true,
            require_for_all_users: false,
            remember_device_days: 30,
        }
    }
}

impl MfaPolicy {
    fn validate(&self) -> Result<(), CoreError> {
        check_range("remember_device_days", self.remember_device_days, 0, 365)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoginPolicy {
    pub max_login_attempts: u32,
    /// Lockout length in minutes.
    pub lockout_duration: u32,
    pub require_captcha_after_failures: u32,
    pub geo_restrictions_enabled: bool,
    /// ISO 3166-1 alpha-2 country codes.
    pub allowed_countries: Vec<String>,
}

impl Default for LoginPolicy {
    fn default() -> Self {
        Self {
            max_login_attempts: 5,
            lockout_duration: 30,
            require_captcha_after_failures: 3,
            geo_restrictions_enabled: false,
            allowed_countries: Vec::new(),
        }
    }
}

impl LoginPolicy {
    fn validate(&self) -> Result<(), CoreError> {
        check_range("max_login_attempts", self.max_login_attempts, 1, 100)?;
        check_range("lockout_duration", self.lockout_duration, 1, 1440)?;
        check_range(
            "require_captcha_after_failures",
            self.require_captcha_after_failures,
            0,
            100,
        )?;
        if let Some(bad) = self
            .allowed_countries
            .iter()
            .find(|c| c.len() != 2 || !c.chars().all(|ch| ch.is_ascii_uppercase()))
        {
            return Err(CoreError::Validation(format!(
                "allowed_countries entry '{bad}' is not an ISO 3166-1 alpha-2 code"
            )));
        }
        Ok(())
    }
}

fn check_range(field: &str, value: u32, min: u32, max: u32) -> Result<(), CoreError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "{field} must be between {min} and {max} (got {value})"
        )))
    }
}

// ---------------------------------------------------------------------------
// PolicySettings
// ---------------------------------------------------------------------------

/// Validated settings for one policy type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicySettings {
    Password(PasswordPolicy),
    Session(SessionPolicy),
    Mfa(MfaPolicy),
    Login(LoginPolicy),
}

impl PolicySettings {
    /// Validate raw JSON settings for `policy_type`.
    ///
    /// `null` yields the defaults. Missing keys take their default value,
    /// unknown keys are rejected, and an `is_active` key is ignored.
    pub fn parse(
        policy_type: PolicyType,
        raw: &serde_json::Value,
    ) -> Result<Self, CoreError> {
        let value = match raw {
            serde_json::Value::Null => serde_json::Value::Object(Default::default()),
            serde_json::Value::Object(map) => {
                let mut map = map.clone();
                map.remove(IS_ACTIVE_KEY);
                serde_json::Value::Object(map)
            }
            _ => {
                return Err(CoreError::Validation(
                    "Policy settings must be a JSON object".into(),
                ))
            }
        };

        let settings = match policy_type {
            PolicyType::Password => {
                let s: PasswordPolicy = decode(policy_type, value)?;
                s.validate()?;
                Self::Password(s)
            }
            PolicyType::Session => {
                let s: SessionPolicy = decode(policy_type, value)?;
                s.validate()?;
                Self::Session(s)
            }
            PolicyType::Mfa => {
                let s: MfaPolicy = decode(policy_type, value)?;
                s.validate()?;
                Self::Mfa(s)
            }
            PolicyType::Login => {
                let s: LoginPolicy = decode(policy_type, value)?;
                s.validate()?;
                Self::Login(s)
            }
        };
        Ok(settings)
    }

    /// Normalised JSON with every key present.
    pub fn to_json(&self) -> serde_json::Value {
        let value = match self {
            Self::Password(s) => serde_json::to_value(s),
            Self::Session(s) => serde_json::to_value(s),
            Self::Mfa(s) => serde_json::to_value(s),
            Self::Login(s) => serde_json::to_value(s),
        };
        // Plain structs of bools, integers and strings always serialize.
        value.unwrap_or(serde_json::Value::Null)
    }
}

fn decode<T: DeserializeOwned>(
    policy_type: PolicyType,
    value: serde_json::Value,
) -> Result<T, CoreError> {
    serde_json::from_value(value).map_err(|e| {
        CoreError::Validation(format!("Invalid {policy_type} policy settings: {e}"))
    })
}

/// Decode stored settings for enforcement, falling back to defaults when the
/// stored JSON no longer parses.
pub fn stored_or_default<T: DeserializeOwned + Default>(raw: Option<&serde_json::Value>) -> T {
    raw.and_then(|v| {
        let mut v = v.clone();
        if let serde_json::Value::Object(map) = &mut v {
            map.remove(IS_ACTIVE_KEY);
        }
        serde_json::from_value(v).ok()
    })
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::{Duration, Utc};
    use serde_json::json;

    use super::*;

    #[test]
    fn default_password_policy_accepts_strong_password() {
        assert!(PasswordPolicy::default().check("Str0ng!pass").is_ok());
    }

    #[test]
    fn password_check_lists_every_violation() {
        let violations = PasswordPolicy::default().check("abc").unwrap_err();
        assert_eq!(violations.len(), 4, "length, upper, number, special: {violations:?}");
    }

    #[test]
    fn relaxed_policy_only_checks_length() {
        let policy = PasswordPolicy {
            min_length: 4,
            require_uppercase: false,
            require_lowercase: false,
            require_numbers: false,
            require_special_chars: false,
            password_history: 0,
            expiry_days: 0,
        };
        assert!(policy.check("abcd").is_ok());
        assert!(policy.enforce("abc").is_err());
    }

    #[test]
    fn password_expiry() {
        let policy = PasswordPolicy::default();
        let now = Utc::now();
        assert!(policy.is_expired(now - Duration::days(91), now));
        assert!(!policy.is_expired(now - Duration::days(10), now));

        let never = PasswordPolicy {
            expiry_days: 0,
            ..PasswordPolicy::default()
        };
        assert!(!never.is_expired(now - Duration::days(10_000), now));
    }

    #[test]
    fn missing_keys_take_defaults() {
        let parsed =
            PolicySettings::parse(PolicyType::Login, &json!({ "max_login_attempts": 3 })).unwrap();
        assert_matches!(
            parsed,
            PolicySettings::Login(LoginPolicy { max_login_attempts: 3, lockout_duration: 30, .. })
        );
    }

    #[test]
    fn is_active_key_is_ignored() {
        let parsed = PolicySettings::parse(
            PolicyType::Mfa,
            &json!({ "require_for_all_users": true, "is_active": false }),
        )
        .unwrap();
        assert_eq!(parsed.to_json()["require_for_all_users"], true);
        assert!(parsed.to_json().get("is_active").is_none());
    }

    #[test]
    fn unknown_keys_and_bad_ranges_are_rejected() {
        assert_matches!(
            PolicySettings::parse(PolicyType::Session, &json!({ "colour": "blue" })),
            Err(CoreError::Validation(_))
        );
        assert_matches!(
            PolicySettings::parse(PolicyType::Password, &json!({ "min_length": 1 })),
            Err(CoreError::Validation(_))
        );
        assert_matches!(
            PolicySettings::parse(PolicyType::Login, &json!({ "allowed_countries": ["usa"] })),
            Err(CoreError::Validation(_))
        );
        assert_matches!(
            PolicySettings::parse(PolicyType::Mfa, &json!([1, 2])),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn null_settings_yield_defaults() {
        let parsed = PolicySettings::parse(PolicyType::Session, &serde_json::Value::Null).unwrap();
        assert_eq!(parsed, PolicySettings::Session(SessionPolicy::default()));
    }

    #[test]
    fn stored_settings_fall_back_to_defaults() {
        let broken = json!({ "min_length": "eight" });
        let policy: PasswordPolicy = stored_or_default(Some(&broken));
        assert_eq!(policy, PasswordPolicy::default());

        let none: SessionPolicy = stored_or_default(None);
        assert_eq!(none.max_sessions_per_user, 5);
    }

    #[test]
    fn policy_type_parsing() {
        assert_eq!("mfa".parse::<PolicyType>().unwrap(), PolicyType::Mfa);
        assert_matches!("vpn".parse::<PolicyType>(), Err(CoreError::Validation(_)));
    }
}
