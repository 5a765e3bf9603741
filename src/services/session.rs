use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::dtos::auth::IntrospectResponse;
use crate::models::Role;

/// Session token issue/verify.
///
/// Tokens are stateless: validity is entirely self-contained (signature
/// plus expiry), there is no server-side record and no revocation list.
/// Logout is client-side token discard.
#[derive(Clone)]
pub struct SessionService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_expiry_hours: i64,
}

/// Claims asserted by a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (account email)
    pub sub: String,
    /// Account role at issue time
    pub role: Role,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Token ID
    pub jti: String,
}

impl SessionService {
    pub fn new(config: &SessionConfig) -> Result<Self, anyhow::Error> {
        if config.secret.is_empty() {
            return Err(anyhow::anyhow!("Session signing secret must not be empty"));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            token_expiry_hours: config.token_expiry_hours,
        })
    }

    /// Mint a signed token binding identity and role for a fixed lifetime.
    pub fn issue(&self, email: &str, role: Role) -> Result<String, anyhow::Error> {
        let now = Utc::now();
        let exp = now + Duration::hours(self.token_expiry_hours);

        let claims = SessionClaims {
            sub: email.to_string(),
            role,
            exp: exp.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let header = Header::new(Algorithm::HS256);
        let token = encode(&header, &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode session token: {}", e))?;

        Ok(token)
    }

    /// Check signature and expiry, returning the embedded claims.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, anyhow::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        let token_data = decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| anyhow::anyhow!("Invalid session token: {}", e))?;

        Ok(token_data.claims)
    }

    /// Introspect a token without failing: inactive on any verify error.
    pub fn introspect(&self, token: &str) -> IntrospectResponse {
        match self.verify(token) {
            Ok(claims) => IntrospectResponse {
                active: true,
                sub: Some(claims.sub),
                role: Some(claims.role),
                exp: Some(claims.exp),
                iat: Some(claims.iat),
            },
            Err(_) => IntrospectResponse {
                active: false,
                sub: None,
                role: None,
                exp: None,
                iat: None,
            },
        }
    }

    pub fn token_expiry_seconds(&self) -> i64 {
        self.token_expiry_hours * 3600
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> SessionConfig {
        SessionConfig {
            secret: "test-session-secret-at-least-32-bytes!".to_string(),
            token_expiry_hours: 24,
        }
    }

    #[test]
    fn test_issue_and_verify_roundtrip() {
        let service = SessionService::new(&test_config()).unwrap();

        let token = service.issue("a@x.com", Role::Instructor).unwrap();
        assert!(!token.is_empty());

        let claims = service.verify(&token).unwrap();
        assert_eq!(claims.sub, "a@x.com");
        assert_eq!(claims.role, Role::Instructor);
        assert!(claims.exp - claims.iat == 24 * 3600);
    }

    #[test]
    fn test_tampered_token_rejected() {
        let service = SessionService::new(&test_config()).unwrap();
        let token = service.issue("a@x.com", Role::Learner).unwrap();

        let mut tampered = token.clone();
        tampered.pop();
        assert!(service.verify(&tampered).is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let service = SessionService::new(&test_config()).unwrap();
        let other = SessionService::new(&SessionConfig {
            secret: "a-completely-different-signing-secret".to_string(),
            token_expiry_hours: 24,
        })
        .unwrap();

        let token = service.issue("a@x.com", Role::Learner).unwrap();
        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn test_introspect_garbage_token_is_inactive() {
        let service = SessionService::new(&test_config()).unwrap();
        let res = service.introspect("not-a-jwt");
        assert!(!res.active);
        assert!(res.sub.is_none());
    }

    #[test]
    fn test_empty_secret_rejected() {
        let config = SessionConfig {
            secret: String::new(),
            token_expiry_hours: 24,
        };
        assert!(SessionService::new(&config).is_err());
    }
}
