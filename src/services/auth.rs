use std::sync::Arc;

use validator::ValidateEmail;

use crate::{
    dtos::auth::{
        ForgotPasswordRequest, LoginRequest, LoginResponse, MessageResponse, RegisterRequest,
        RegisterResponse, ResetPasswordRequest, UserResponse, VerifyEmailRequest, VerifyOtpRequest,
        VerifyResponse,
    },
    models::{Account, ChallengeKind},
    services::{ChallengeIssuer, ChallengeStore, CredentialStore, ServiceError, SessionService},
    utils::{hash_password, verify_password, Password, PasswordHashString},
};

/// Orchestrates the registration, verification, login, and password
/// reset flows over the credential and challenge stores.
#[derive(Clone)]
pub struct AuthService {
    credentials: Arc<dyn CredentialStore>,
    challenges: Arc<dyn ChallengeStore>,
    issuer: ChallengeIssuer,
    sessions: SessionService,
}

impl AuthService {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        challenges: Arc<dyn ChallengeStore>,
        issuer: ChallengeIssuer,
        sessions: SessionService,
    ) -> Self {
        Self {
            credentials,
            challenges,
            issuer,
            sessions,
        }
    }

    pub async fn register(&self, req: RegisterRequest) -> Result<RegisterResponse, ServiceError> {
        if !req.email.validate_email() {
            return Err(ServiceError::InvalidEmail);
        }
        validate_password_strength(&req.password)?;

        let password_hash = hash_password(&Password::new(req.password)).map_err(|e| {
            ServiceError::Internal(anyhow::anyhow!("Password hashing error: {}", e))
        })?;

        // The store's atomic insert is the duplicate check; a concurrent
        // register for the same email loses with a Conflict.
        let account = Account::new(
            req.email.clone(),
            req.display_name,
            password_hash.into_string(),
            req.role.unwrap_or_default(),
        );
        let account = self.credentials.create(account).await?;

        tracing::info!(email = %account.email, role = %account.role.as_str(), "Account registered");

        // Account creation is durable at this point. A delivery failure
        // surfaces to the caller but the stored challenge stays valid;
        // a retried issuance supersedes it.
        self.issuer.issue(&account.email, ChallengeKind::Verify).await?;

        Ok(RegisterResponse {
            email: account.email,
            message: "Registered. Please verify your email to continue.".to_string(),
        })
    }

    pub async fn verify_email(&self, req: VerifyEmailRequest) -> Result<VerifyResponse, ServiceError> {
        let challenge = self
            .challenges
            .get(&req.email)
            .await?
            .ok_or_else(|| challenge_rejected(&req.email, ServiceError::NoChallenge))?;

        if challenge.kind != ChallengeKind::Verify {
            return Err(challenge_rejected(&req.email, ServiceError::WrongChallengeKind));
        }

        if challenge.is_expired() {
            // Stale slot is reclaimed on detection
            self.challenges.delete(&req.email).await?;
            return Err(challenge_rejected(&req.email, ServiceError::ChallengeExpired));
        }

        if challenge.code != req.code {
            return Err(challenge_rejected(&req.email, ServiceError::CodeMismatch));
        }

        self.credentials.set_verified(&req.email).await?;
        self.challenges.delete(&req.email).await?;

        tracing::info!(email = %req.email, "Email verified");

        Ok(VerifyResponse {
            message: "Email verified successfully".to_string(),
        })
    }

    pub async fn login(&self, req: LoginRequest) -> Result<LoginResponse, ServiceError> {
        let account = self
            .credentials
            .find_by_email(&req.email)
            .await?
            .ok_or(ServiceError::AccountNotFound)?;

        if !account.verified {
            return Err(ServiceError::NotVerified);
        }

        verify_password(
            &Password::new(req.password),
            &PasswordHashString::new(account.password_hash.clone()),
        )
        .map_err(|_| ServiceError::BadCredentials)?;

        let token = self
            .sessions
            .issue(&account.email, account.role)
            .map_err(ServiceError::Internal)?;

        tracing::info!(email = %account.email, "Login successful");

        Ok(LoginResponse {
            token,
            token_type: "Bearer".to_string(),
            expires_in: self.sessions.token_expiry_seconds(),
            user: UserResponse::from(&account),
        })
    }

    /// Issue a reset challenge. The account need not be verified yet.
    pub async fn forgot_password(
        &self,
        req: ForgotPasswordRequest,
    ) -> Result<MessageResponse, ServiceError> {
        self.credentials
            .find_by_email(&req.email)
            .await?
            .ok_or(ServiceError::AccountNotFound)?;

        self.issuer.issue(&req.email, ChallengeKind::Reset).await?;

        Ok(MessageResponse {
            message: "OTP sent to email".to_string(),
        })
    }

    /// First phase of the reset state machine: Issued -> Verified.
    /// The challenge is retained for the reset_password step.
    pub async fn verify_reset_challenge(
        &self,
        req: VerifyOtpRequest,
    ) -> Result<MessageResponse, ServiceError> {
        let challenge = self
            .challenges
            .get(&req.email)
            .await?
            .ok_or_else(|| challenge_rejected(&req.email, ServiceError::NoChallenge))?;

        if challenge.kind != ChallengeKind::Reset {
            return Err(challenge_rejected(&req.email, ServiceError::WrongChallengeKind));
        }

        if challenge.is_expired() {
            return Err(challenge_rejected(&req.email, ServiceError::ChallengeExpired));
        }

        if challenge.code != req.code {
            return Err(challenge_rejected(&req.email, ServiceError::CodeMismatch));
        }

        // Flag the identity's *current* slot; if a superseding put raced
        // us and emptied it, report NoChallenge rather than resurrecting.
        if !self.challenges.mark_verified(&req.email).await? {
            return Err(challenge_rejected(&req.email, ServiceError::NoChallenge));
        }

        tracing::info!(email = %req.email, "Reset challenge verified");

        Ok(MessageResponse {
            message: "OTP verified".to_string(),
        })
    }

    /// Second phase: consume a Verified reset challenge and rotate the
    /// password hash.
    pub async fn reset_password(
        &self,
        req: ResetPasswordRequest,
    ) -> Result<MessageResponse, ServiceError> {
        validate_password_strength(&req.new_password)?;

        let eligible = match self.challenges.get(&req.email).await? {
            Some(challenge) => challenge.kind == ChallengeKind::Reset && challenge.verified,
            None => false,
        };
        if !eligible {
            return Err(challenge_rejected(
                &req.email,
                ServiceError::ChallengeNotVerified,
            ));
        }

        let password_hash = hash_password(&Password::new(req.new_password)).map_err(|e| {
            ServiceError::Internal(anyhow::anyhow!("Password hashing error: {}", e))
        })?;

        self.credentials
            .set_password_hash(&req.email, password_hash.into_string())
            .await?;
        self.challenges.delete(&req.email).await?;

        tracing::info!(email = %req.email, "Password reset successful");

        Ok(MessageResponse {
            message: "Password reset successful".to_string(),
        })
    }
}

/// Trace the precise precondition failure before it collapses into the
/// generic boundary message.
fn challenge_rejected(email: &str, err: ServiceError) -> ServiceError {
    tracing::warn!(email = %email, reason = %err, "Challenge check failed");
    err
}

/// Password policy: at least 8 characters, at least one letter and one
/// digit.
fn validate_password_strength(password: &str) -> Result<(), ServiceError> {
    let long_enough = password.chars().count() >= 8;
    let has_letter = password.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());

    if long_enough && has_letter && has_digit {
        Ok(())
    } else {
        Err(ServiceError::WeakPassword)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::models::{Challenge, Role};
    use crate::services::{InMemoryChallengeStore, InMemoryCredentialStore, MockNotifier};
    use chrono::{Duration, Utc};

    struct Fixture {
        service: AuthService,
        challenges: Arc<InMemoryChallengeStore>,
        notifier: Arc<MockNotifier>,
    }

    fn fixture() -> Fixture {
        let credentials = Arc::new(InMemoryCredentialStore::new());
        let challenges = Arc::new(InMemoryChallengeStore::new());
        let notifier = Arc::new(MockNotifier::new());
        let issuer = ChallengeIssuer::new(challenges.clone(), notifier.clone());
        let sessions = SessionService::new(&SessionConfig {
            secret: "unit-test-session-secret-32-bytes-long".to_string(),
            token_expiry_hours: 24,
        })
        .unwrap();

        Fixture {
            service: AuthService::new(credentials, challenges.clone(), issuer, sessions),
            challenges,
            notifier,
        }
    }

    fn register_req(email: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            display_name: "Alice".to_string(),
            password: "Passw0rd".to_string(),
            role: None,
        }
    }

    async fn register_and_verify(fx: &Fixture, email: &str) {
        fx.service.register(register_req(email)).await.unwrap();
        let code = fx.notifier.last_code_for(email).unwrap();
        fx.service
            .verify_email(VerifyEmailRequest {
                email: email.to_string(),
                code,
            })
            .await
            .unwrap();
    }

    #[test]
    fn password_policy() {
        assert!(validate_password_strength("Passw0rd").is_ok());
        assert!(validate_password_strength("pass1").is_err()); // too short
        assert!(validate_password_strength("passwords").is_err()); // no digit
        assert!(validate_password_strength("12345678").is_err()); // no letter
    }

    #[tokio::test]
    async fn register_rejects_invalid_email_and_weak_password() {
        let fx = fixture();

        let mut req = register_req("not-an-email");
        assert!(matches!(
            fx.service.register(req).await.unwrap_err(),
            ServiceError::InvalidEmail
        ));

        req = register_req("a@x.com");
        req.password = "short1".to_string();
        assert!(matches!(
            fx.service.register(req).await.unwrap_err(),
            ServiceError::WeakPassword
        ));

        // Nothing was issued for either attempt
        assert_eq!(fx.notifier.sent_count(), 0);
    }

    #[tokio::test]
    async fn register_duplicate_conflicts() {
        let fx = fixture();
        fx.service.register(register_req("a@x.com")).await.unwrap();

        assert!(matches!(
            fx.service.register(register_req("a@x.com")).await.unwrap_err(),
            ServiceError::EmailAlreadyRegistered
        ));
    }

    #[tokio::test]
    async fn full_register_verify_login_scenario() {
        let fx = fixture();

        fx.service.register(register_req("a@x.com")).await.unwrap();
        let code = fx.notifier.last_code_for("a@x.com").unwrap();

        // Wrong code leaves the account unverified
        let err = fx
            .service
            .verify_email(VerifyEmailRequest {
                email: "a@x.com".to_string(),
                code: "000000".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::CodeMismatch));

        let err = fx
            .service
            .login(LoginRequest {
                email: "a@x.com".to_string(),
                password: "Passw0rd".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotVerified));

        // Correct code verifies and consumes the challenge
        fx.service
            .verify_email(VerifyEmailRequest {
                email: "a@x.com".to_string(),
                code: code.clone(),
            })
            .await
            .unwrap();
        assert!(fx.challenges.get("a@x.com").await.unwrap().is_none());

        let res = fx
            .service
            .login(LoginRequest {
                email: "a@x.com".to_string(),
                password: "Passw0rd".to_string(),
            })
            .await
            .unwrap();
        assert!(!res.token.is_empty());
        assert_eq!(res.user.role, Role::Learner);

        let err = fx
            .service
            .login(LoginRequest {
                email: "a@x.com".to_string(),
                password: "WrongPass1".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::BadCredentials));
    }

    #[tokio::test]
    async fn login_unknown_account_not_found() {
        let fx = fixture();
        let err = fx
            .service
            .login(LoginRequest {
                email: "ghost@x.com".to_string(),
                password: "Passw0rd".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::AccountNotFound));
    }

    #[tokio::test]
    async fn verify_email_without_challenge_fails() {
        let fx = fixture();
        let err = fx
            .service
            .verify_email(VerifyEmailRequest {
                email: "a@x.com".to_string(),
                code: "123456".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NoChallenge));
    }

    #[tokio::test]
    async fn verify_email_rejects_reset_challenge() {
        let fx = fixture();
        register_and_verify(&fx, "a@x.com").await;
        fx.service
            .forgot_password(ForgotPasswordRequest {
                email: "a@x.com".to_string(),
            })
            .await
            .unwrap();
        let code = fx.notifier.last_code_for("a@x.com").unwrap();

        let err = fx
            .service
            .verify_email(VerifyEmailRequest {
                email: "a@x.com".to_string(),
                code,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::WrongChallengeKind));
    }

    #[tokio::test]
    async fn expired_verify_challenge_fails_and_is_deleted() {
        let fx = fixture();
        fx.service.register(register_req("a@x.com")).await.unwrap();
        let code = fx.notifier.last_code_for("a@x.com").unwrap();

        // Time-travel the stored challenge past its expiry
        let mut challenge = Challenge::new(code.clone(), ChallengeKind::Verify);
        challenge.issued_at = Utc::now() - Duration::minutes(20);
        challenge.expires_at = Utc::now() - Duration::minutes(10);
        fx.challenges.put("a@x.com", challenge).await.unwrap();

        let err = fx
            .service
            .verify_email(VerifyEmailRequest {
                email: "a@x.com".to_string(),
                code,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::ChallengeExpired));
        // Stale slot was reclaimed
        assert!(fx.challenges.get("a@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn forgot_password_unknown_account_not_found() {
        let fx = fixture();
        let err = fx
            .service
            .forgot_password(ForgotPasswordRequest {
                email: "ghost@x.com".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::AccountNotFound));
    }

    #[tokio::test]
    async fn forgot_password_works_for_unverified_account() {
        let fx = fixture();
        fx.service.register(register_req("a@x.com")).await.unwrap();

        fx.service
            .forgot_password(ForgotPasswordRequest {
                email: "a@x.com".to_string(),
            })
            .await
            .unwrap();
        let stored = fx.challenges.get("a@x.com").await.unwrap().unwrap();
        assert_eq!(stored.kind, ChallengeKind::Reset);
    }

    #[tokio::test]
    async fn reset_flow_rotates_password_and_consumes_challenge() {
        let fx = fixture();
        register_and_verify(&fx, "a@x.com").await;

        fx.service
            .forgot_password(ForgotPasswordRequest {
                email: "a@x.com".to_string(),
            })
            .await
            .unwrap();
        let code = fx.notifier.last_code_for("a@x.com").unwrap();

        // Reset before verifying the challenge is refused
        let err = fx
            .service
            .reset_password(ResetPasswordRequest {
                email: "a@x.com".to_string(),
                new_password: "NewPassw0rd".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::ChallengeNotVerified));

        fx.service
            .verify_reset_challenge(VerifyOtpRequest {
                email: "a@x.com".to_string(),
                code,
            })
            .await
            .unwrap();
        // Challenge retained in Verified state for the reset step
        assert!(fx.challenges.get("a@x.com").await.unwrap().unwrap().verified);

        fx.service
            .reset_password(ResetPasswordRequest {
                email: "a@x.com".to_string(),
                new_password: "NewPassw0rd".to_string(),
            })
            .await
            .unwrap();

        // Old password no longer authenticates, new one does
        assert!(matches!(
            fx.service
                .login(LoginRequest {
                    email: "a@x.com".to_string(),
                    password: "Passw0rd".to_string(),
                })
                .await
                .unwrap_err(),
            ServiceError::BadCredentials
        ));
        fx.service
            .login(LoginRequest {
                email: "a@x.com".to_string(),
                password: "NewPassw0rd".to_string(),
            })
            .await
            .unwrap();

        // Challenge is gone; a second reset with the same state is refused
        assert!(fx.challenges.get("a@x.com").await.unwrap().is_none());
        assert!(matches!(
            fx.service
                .reset_password(ResetPasswordRequest {
                    email: "a@x.com".to_string(),
                    new_password: "OtherPassw0rd1".to_string(),
                })
                .await
                .unwrap_err(),
            ServiceError::ChallengeNotVerified
        ));
    }

    #[tokio::test]
    async fn superseded_reset_challenge_invalidates_old_code() {
        let fx = fixture();
        register_and_verify(&fx, "a@x.com").await;

        fx.service
            .forgot_password(ForgotPasswordRequest {
                email: "a@x.com".to_string(),
            })
            .await
            .unwrap();
        let first_code = fx.notifier.last_code_for("a@x.com").unwrap();

        // Second issuance supersedes the first slot entirely
        fx.service
            .forgot_password(ForgotPasswordRequest {
                email: "a@x.com".to_string(),
            })
            .await
            .unwrap();
        let second_code = fx.notifier.last_code_for("a@x.com").unwrap();
        assert_ne!(first_code, second_code);

        let err = fx
            .service
            .verify_reset_challenge(VerifyOtpRequest {
                email: "a@x.com".to_string(),
                code: first_code,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::CodeMismatch));
    }

    #[tokio::test]
    async fn supersede_clears_verified_state_from_prior_challenge() {
        let fx = fixture();
        register_and_verify(&fx, "a@x.com").await;

        fx.service
            .forgot_password(ForgotPasswordRequest {
                email: "a@x.com".to_string(),
            })
            .await
            .unwrap();
        let code = fx.notifier.last_code_for("a@x.com").unwrap();
        fx.service
            .verify_reset_challenge(VerifyOtpRequest {
                email: "a@x.com".to_string(),
                code,
            })
            .await
            .unwrap();

        // Re-issue after the first challenge was verified
        fx.service
            .forgot_password(ForgotPasswordRequest {
                email: "a@x.com".to_string(),
            })
            .await
            .unwrap();

        // The fresh challenge is unverified, so reset is refused
        assert!(matches!(
            fx.service
                .reset_password(ResetPasswordRequest {
                    email: "a@x.com".to_string(),
                    new_password: "NewPassw0rd".to_string(),
                })
                .await
                .unwrap_err(),
            ServiceError::ChallengeNotVerified
        ));
    }

    #[tokio::test]
    async fn expired_reset_challenge_fails_but_is_retained() {
        let fx = fixture();
        register_and_verify(&fx, "a@x.com").await;

        let mut challenge = Challenge::new("654321".to_string(), ChallengeKind::Reset);
        challenge.expires_at = Utc::now() - Duration::seconds(1);
        fx.challenges.put("a@x.com", challenge).await.unwrap();

        let err = fx
            .service
            .verify_reset_challenge(VerifyOtpRequest {
                email: "a@x.com".to_string(),
                code: "654321".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::ChallengeExpired));
        // Unlike the verify-email path, the slot is left for the next
        // issuance to supersede
        assert!(fx.challenges.get("a@x.com").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn reset_password_enforces_policy_before_state_checks() {
        let fx = fixture();
        let err = fx
            .service
            .reset_password(ResetPasswordRequest {
                email: "a@x.com".to_string(),
                new_password: "weak".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::WeakPassword));
    }
}
