//! Access request lifecycle.
//!
//! ```text
//!            approve             reject              cancel
//! pending ----------> approved   -------> rejected   -------> cancelled
//! ```
//!
//! Only `pending` requests move. The other three states are terminal.

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

/// Resource type used when a request targets a role grant.
pub const RESOURCE_TYPE_ROLE: &str = "role";

/// Maximum length of the free-text justification.
pub const MAX_JUSTIFICATION_LEN: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessRequestStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl AccessRequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for AccessRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessRequestStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(CoreError::Validation(format!(
                "Unknown access request status '{other}'"
            ))),
        }
    }
}

/// A state-changing action on an access request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
    Cancel,
}

impl Decision {
    pub fn target(self) -> AccessRequestStatus {
        match self {
            Self::Approve => AccessRequestStatus::Approved,
            Self::Reject => AccessRequestStatus::Rejected,
            Self::Cancel => AccessRequestStatus::Cancelled,
        }
    }

    fn verb(self) -> &'static str {
        match self {
            Self::Approve => "approved",
            Self::Reject => "rejected",
            Self::Cancel => "cancelled",
        }
    }
}

/// Who is attempting a decision, and with what authority.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub user_id: DbId,
    pub is_admin: bool,
    pub can_approve: bool,
}

/// Check that `actor` may apply `decision` to a request owned by
/// `requester_id` currently in `current`. Returns the new status.
pub fn transition(
    current: AccessRequestStatus,
    decision: Decision,
    requester_id: DbId,
    actor: Actor,
) -> Result<AccessRequestStatus, CoreError> {
    if current.is_terminal() {
        return Err(CoreError::Conflict(format!(
            "Request is already {current} and cannot be {}",
            decision.verb()
        )));
    }

    let is_requester = actor.user_id == requester_id;

    match decision {
        Decision::Approve | Decision::Reject => {
            if !(actor.can_approve || actor.is_admin) {
                return Err(CoreError::Forbidden(
                    "Approving or rejecting requests requires request:approve".into(),
                ));
            }
            if is_requester {
                return Err(CoreError::Forbidden(
                    "You cannot decide on your own access request".into(),
                ));
            }
        }
        Decision::Cancel => {
            if !(is_requester || actor.is_admin) {
                return Err(CoreError::Forbidden(
                    "Only the requester or an administrator can cancel a request".into(),
                ));
            }
        }
    }

    Ok(decision.target())
}

/// Validate the duration fields of a new request.
pub fn validate_duration(
    is_temporary: bool,
    expires_at: Option<Timestamp>,
) -> Result<(), CoreError> {
    match (is_temporary, expires_at) {
        (true, None) => Err(CoreError::Validation(
            "Temporary requests require an expiry date".into(),
        )),
        (true, Some(at)) if at <= Utc::now() => Err(CoreError::Validation(
            "Expiry date must be in the future".into(),
        )),
        (false, Some(_)) => Err(CoreError::Validation(
            "Permanent requests cannot carry an expiry date".into(),
        )),
        _ => Ok(()),
    }
}

/// Validate the free-text justification.
pub fn validate_justification(justification: &str) -> Result<(), CoreError> {
    let trimmed = justification.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation("Justification is required".into()));
    }
    if trimmed.len() > MAX_JUSTIFICATION_LEN {
        return Err(CoreError::Validation(format!(
            "Justification must be at most {MAX_JUSTIFICATION_LEN} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::Duration;
    use uuid::Uuid;

    use super::*;

    fn approver() -> Actor {
        Actor {
            user_id: Uuid::new_v4(),
            is_admin: false,
            can_approve: true,
        }
    }

    #[test]
    fn approver_moves_pending_to_approved() {
        let requester = Uuid::new_v4();
        let next = transition(
            AccessRequestStatus::Pending,
            Decision::Approve,
            requester,
            approver(),
        )
        .unwrap();
        assert_eq!(next, AccessRequestStatus::Approved);
    }

    #[test]
    fn terminal_states_do_not_move() {
        let requester = Uuid::new_v4();
        for status in [
            AccessRequestStatus::Approved,
            AccessRequestStatus::Rejected,
            AccessRequestStatus::Cancelled,
        ] {
            assert_matches!(
                transition(status, Decision::Reject, requester, approver()),
                Err(CoreError::Conflict(_))
            );
        }
    }

    #[test]
    fn requester_cannot_self_approve() {
        let actor = approver();
        assert_matches!(
            transition(
                AccessRequestStatus::Pending,
                Decision::Approve,
                actor.user_id,
                actor
            ),
            Err(CoreError::Forbidden(_))
        );
    }

    #[test]
    fn plain_user_cannot_approve() {
        let actor = Actor {
            user_id: Uuid::new_v4(),
            is_admin: false,
            can_approve: false,
        };
        assert_matches!(
            transition(
                AccessRequestStatus::Pending,
                Decision::Reject,
                Uuid::new_v4(),
                actor
            ),
            Err(CoreError::Forbidden(_))
        );
    }

    #[test]
    fn cancel_is_limited_to_requester_or_admin() {
        let requester = Uuid::new_v4();
        let own = Actor {
            user_id: requester,
            is_admin: false,
            can_approve: false,
        };
        assert_eq!(
            transition(AccessRequestStatus::Pending, Decision::Cancel, requester, own).unwrap(),
            AccessRequestStatus::Cancelled
        );

        // An approver who is not an admin cannot cancel someone else's request.
        assert_matches!(
            transition(
                AccessRequestStatus::Pending,
                Decision::Cancel,
                requester,
                approver()
            ),
            Err(CoreError::Forbidden(_))
        );

        let admin = Actor {
            user_id: Uuid::new_v4(),
            is_admin: true,
            can_approve: false,
        };
        assert!(transition(AccessRequestStatus::Pending, Decision::Cancel, requester, admin).is_ok());
    }

    #[test]
    fn status_round_trips_through_str() {
        for s in ["pending", "approved", "rejected", "cancelled"] {
            assert_eq!(s.parse::<AccessRequestStatus>().unwrap().as_str(), s);
        }
        assert!("denied".parse::<AccessRequestStatus>().is_err());
    }

    #[test]
    fn duration_rules() {
        let future = Utc::now() + Duration::days(3);
        let past = Utc::now() - Duration::days(1);
        assert!(validate_duration(false, None).is_ok());
        assert!(validate_duration(true, Some(future)).is_ok());
        assert!(validate_duration(true, None).is_err());
        assert!(validate_duration(true, Some(past)).is_err());
        assert!(validate_duration(false, Some(future)).is_err());
    }

    #[test]
    fn justification_must_be_present() {
        assert!(validate_justification("need to rotate prod keys").is_ok());
        assert!(validate_justification("  ").is_err());
    }
}
