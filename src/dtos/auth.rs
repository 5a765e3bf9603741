use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::{Account, Role};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "learner@example.com")]
    pub email: String,

    #[validate(length(min = 1, message = "Display name is required"))]
    #[schema(example = "Alice")]
    pub display_name: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    #[schema(example = "Passw0rd", min_length = 8)]
    pub password: String,

    pub role: Option<Role>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterResponse {
    #[schema(example = "learner@example.com")]
    pub email: String,
    #[schema(example = "Registered. Please verify your email to continue.")]
    pub message: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct VerifyEmailRequest {
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "learner@example.com")]
    pub email: String,

    #[validate(length(min = 1, message = "Code is required"))]
    #[schema(example = "123456")]
    pub code: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VerifyResponse {
    #[schema(example = "Email verified successfully")]
    pub message: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "learner@example.com")]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    #[schema(example = "Passw0rd")]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    #[schema(example = "Bearer")]
    pub token_type: String,
    #[schema(example = 86400)]
    pub expires_in: i64,
    pub user: UserResponse,
}

/// Account view for API responses (no sensitive fields).
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserResponse {
    #[schema(example = "learner@example.com")]
    pub email: String,
    #[schema(example = "Alice")]
    pub display_name: String,
    pub role: Role,
}

impl From<&Account> for UserResponse {
    fn from(account: &Account) -> Self {
        Self {
            email: account.email.clone(),
            display_name: account.display_name.clone(),
            role: account.role,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "learner@example.com")]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct VerifyOtpRequest {
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "learner@example.com")]
    pub email: String,

    #[validate(length(min = 1, message = "Code is required"))]
    #[schema(example = "123456")]
    pub code: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ResetPasswordRequest {
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "learner@example.com")]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    #[schema(example = "NewPassw0rd", min_length = 8)]
    pub new_password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    #[schema(example = "OTP sent to email")]
    pub message: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct IntrospectRequest {
    #[schema(example = "eyJhbGciOiJIUzI1NiJ9...")]
    pub token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct IntrospectResponse {
    #[schema(example = true)]
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "learner@example.com")]
    pub sub: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = 1704326400)]
    pub exp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = 1704240000)]
    pub iat: Option<i64>,
}
