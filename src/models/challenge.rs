//! Challenge model - one-time passcode state.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Challenge lifetime. Expiry is evaluated lazily at read time; there is
/// no background sweep, the store holds at most one entry per identity.
pub const CHALLENGE_TTL_MINUTES: i64 = 10;

/// Challenge purpose codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeKind {
    Verify,
    Reset,
}

impl ChallengeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengeKind::Verify => "verify",
            ChallengeKind::Reset => "reset",
        }
    }
}

/// A single outstanding passcode for one identity.
///
/// `verified` is the two-phase reset marker: a reset challenge moves
/// Issued -> Verified before it may be consumed by a password reset.
/// It carries no meaning for verify-email challenges.
#[derive(Debug, Clone)]
pub struct Challenge {
    pub code: String,
    pub kind: ChallengeKind,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub verified: bool,
}

impl Challenge {
    pub fn new(code: String, kind: ChallengeKind) -> Self {
        let now = Utc::now();
        Self {
            code,
            kind,
            issued_at: now,
            expires_at: now + Duration::minutes(CHALLENGE_TTL_MINUTES),
            verified: false,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_challenge_is_not_expired() {
        let challenge = Challenge::new("123456".to_string(), ChallengeKind::Verify);
        assert!(!challenge.is_expired());
        assert!(!challenge.verified);
        assert_eq!(
            challenge.expires_at - challenge.issued_at,
            Duration::minutes(CHALLENGE_TTL_MINUTES)
        );
    }

    #[test]
    fn backdated_challenge_is_expired() {
        let mut challenge = Challenge::new("123456".to_string(), ChallengeKind::Reset);
        challenge.expires_at = Utc::now() - Duration::seconds(1);
        assert!(challenge.is_expired());
    }
}
