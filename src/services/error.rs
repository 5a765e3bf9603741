use crate::error::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Invalid email format")]
    InvalidEmail,

    #[error("Password must be at least 8 characters long and include at least 1 letter and 1 number")]
    WeakPassword,

    #[error("Email already registered")]
    EmailAlreadyRegistered,

    #[error("Account not found")]
    AccountNotFound,

    #[error("Email not verified")]
    NotVerified,

    #[error("Invalid email or password")]
    BadCredentials,

    #[error("No code issued for this email")]
    NoChallenge,

    #[error("Wrong code type")]
    WrongChallengeKind,

    #[error("Code expired")]
    ChallengeExpired,

    #[error("Incorrect code")]
    CodeMismatch,

    #[error("Code verification required")]
    ChallengeNotVerified,

    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::InvalidEmail => AppError::BadRequest(anyhow::anyhow!("Invalid email format")),
            ServiceError::WeakPassword => AppError::BadRequest(anyhow::anyhow!(
                "Password must be at least 8 characters long and include at least 1 letter and 1 number"
            )),
            ServiceError::EmailAlreadyRegistered => {
                AppError::Conflict(anyhow::anyhow!("Email already registered"))
            }
            ServiceError::AccountNotFound => AppError::NotFound(anyhow::anyhow!("Account not found")),
            ServiceError::NotVerified => AppError::Forbidden(anyhow::anyhow!(
                "Please verify your email before logging in"
            )),
            ServiceError::BadCredentials => {
                AppError::AuthError(anyhow::anyhow!("Invalid email or password"))
            }
            // Challenge precondition failures are reported with one generic
            // message so the response cannot be used as an oracle to
            // distinguish "no challenge" from "wrong code". The precise
            // variant is traced where the check happens.
            ServiceError::NoChallenge
            | ServiceError::WrongChallengeKind
            | ServiceError::ChallengeExpired
            | ServiceError::CodeMismatch => {
                AppError::AuthError(anyhow::anyhow!("Invalid or expired verification code"))
            }
            ServiceError::ChallengeNotVerified => {
                AppError::AuthError(anyhow::anyhow!("Code verification required"))
            }
            ServiceError::DeliveryFailed(e) => AppError::EmailError(e),
            ServiceError::Internal(e) => AppError::InternalError(e),
        }
    }
}
