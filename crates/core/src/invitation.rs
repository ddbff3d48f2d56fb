//! Invitation token generation and expiry rules.
//!
//! The plaintext token is handed to the inviter exactly once (inside the
//! invitation link); only its SHA-256 digest is stored.

use rand::Rng;

use crate::error::CoreError;
use crate::types::Timestamp;

/// Length of the generated invitation token (alphanumeric characters).
pub const TOKEN_LENGTH: usize = 48;

/// A freshly generated invitation token.
pub struct GeneratedToken {
    pub plaintext: String,
    pub hash: String,
}

/// Generate a new random invitation token.
pub fn generate_token() -> GeneratedToken {
    let plaintext: String = rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect();
    let hash = hash_token(&plaintext);
    GeneratedToken { plaintext, hash }
}

/// Compute the stored digest of an invitation token.
pub fn hash_token(token: &str) -> String {
    crate::hashing::sha256_hex(token.trim().as_bytes())
}

pub fn is_expired(expires_at: Timestamp, now: Timestamp) -> bool {
    now >= expires_at
}

/// Check that an invitation can still be accepted.
pub fn ensure_acceptable(used: bool, expires_at: Timestamp, now: Timestamp) -> Result<(), CoreError> {
    if used {
        return Err(CoreError::Validation(
            "This invitation has already been used".into(),
        ));
    }
    if is_expired(expires_at, now) {
        return Err(CoreError::Validation("This invitation has expired".into()));
    }
    Ok(())
}

/// Build the link the invitee follows to accept.
pub fn invitation_link(base_url: &str, token: &str) -> String {
    format!("{}/accept-invitation?token={token}", base_url.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    #[test]
    fn generated_token_matches_its_hash() {
        let token = generate_token();
        assert_eq!(token.plaintext.len(), TOKEN_LENGTH);
        assert_eq!(hash_token(&token.plaintext), token.hash);
        assert_ne!(generate_token().plaintext, token.plaintext);
    }

    #[test]
    fn used_or_expired_invitations_are_refused() {
        let now = Utc::now();
        assert!(ensure_acceptable(false, now + Duration::days(1), now).is_ok());
        assert!(ensure_acceptable(true, now + Duration::days(1), now).is_err());
        assert!(ensure_acceptable(false, now, now).is_err());
    }

    #[test]
    fn link_has_single_slash() {
        assert_eq!(
            invitation_link("http://localhost:3000/", "abc"),
            "http://localhost:3000/accept-invitation?token=abc"
        );
    }
}
