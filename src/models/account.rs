//! Account model - platform user credentials.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Account role codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Learner,
    Instructor,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Learner => "learner",
            Role::Instructor => "instructor",
            Role::Admin => "admin",
        }
    }
}

/// Account entity, keyed by email.
///
/// `verified` starts false and flips exactly once, via the email
/// verification flow. An unverified account can never complete login.
#[derive(Debug, Clone)]
pub struct Account {
    pub email: String,
    pub display_name: String,
    pub password_hash: String,
    pub role: Role,
    pub verified: bool,
}

impl Account {
    /// Create a new, unverified account.
    pub fn new(email: String, display_name: String, password_hash: String, role: Role) -> Self {
        Self {
            email,
            display_name,
            password_hash,
            role,
            verified: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_account_starts_unverified() {
        let account = Account::new(
            "a@x.com".to_string(),
            "Alice".to_string(),
            "$argon2id$stub".to_string(),
            Role::default(),
        );
        assert!(!account.verified);
        assert_eq!(account.role, Role::Learner);
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Instructor).unwrap(), "\"instructor\"");
        assert_eq!(Role::Admin.as_str(), "admin");
    }
}
