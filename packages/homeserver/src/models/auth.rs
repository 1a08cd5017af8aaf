use crate::error::AppError;
use crate::utils::identifiers::validate_localpart;
use serde::{Deserialize, Serialize};

/// Request body for account registration.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    /// Desired localpart (1-64 chars of `a-z 0-9 . _ = -`).
    #[schema(example = "alice")]
    pub username: String,
    /// Password (8-128 characters).
    #[schema(example = "s3cure_P@ss!")]
    pub password: String,
}

pub fn validate_register_request(payload: &RegisterRequest) -> Result<(), AppError> {
    validate_localpart(&payload.username)?;
    if payload.password.len() < 8 || payload.password.len() > 128 {
        return Err(AppError::Validation(
            "Password must be 8-128 characters".into(),
        ));
    }
    Ok(())
}

/// Request body for password login.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    /// Localpart or fully qualified user id.
    #[schema(example = "alice")]
    pub user: String,
    #[schema(example = "s3cure_P@ss!")]
    pub password: String,
}

pub fn validate_login_request(payload: &LoginRequest) -> Result<(), AppError> {
    if payload.user.trim().is_empty() {
        return Err(AppError::Validation("User must not be empty".into()));
    }
    if payload.password.is_empty() {
        return Err(AppError::Validation("Password must not be empty".into()));
    }
    Ok(())
}

/// Returned by both registration and login.
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct AuthResponse {
    #[schema(example = "@alice:hs1")]
    pub user_id: String,
    /// Bearer token for the client API.
    #[schema(example = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...")]
    pub access_token: String,
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct WhoAmIResponse {
    #[schema(example = "@alice:hs1")]
    pub user_id: String,
}
