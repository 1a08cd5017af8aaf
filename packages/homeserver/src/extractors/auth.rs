use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;
use crate::state::AppState;
use crate::utils::identifiers::UserId;
use crate::utils::jwt;

/// Authenticated local user extracted from the `Authorization: Bearer <token>` header.
///
/// Add this as a handler parameter to require a logged-in client.
pub struct AuthUser {
    pub user_id: UserId,
}

impl AuthUser {
    /// Returns `Ok(())` if the caller is `user_id`, `Err(PermissionDenied)` otherwise.
    pub fn require_self(&self, user_id: &UserId) -> Result<(), AppError> {
        if &self.user_id == user_id {
            Ok(())
        } else {
            Err(AppError::PermissionDenied(format!(
                "Cannot modify another user's profile ({user_id})"
            )))
        }
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::TokenMissing)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AppError::TokenInvalid)?;

        let claims = jwt::verify(token, &state.config.auth.jwt_secret)
            .map_err(|_| AppError::TokenInvalid)?;
        let user_id = UserId::parse(&claims.sub).map_err(|_| AppError::TokenInvalid)?;

        Ok(AuthUser { user_id })
    }
}
