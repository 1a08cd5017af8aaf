use axum::{Json, extract::State};
use sea_orm::*;
use tracing::instrument;

use crate::entity::user;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::auth::{
    AuthResponse, LoginRequest, RegisterRequest, WhoAmIResponse, validate_login_request,
    validate_register_request,
};
use crate::state::AppState;
use crate::utils::identifiers::UserId;
use crate::utils::{jwt, password};

fn issue_token(state: &AppState, user_id: &str) -> Result<String, AppError> {
    jwt::sign(
        user_id,
        &state.config.auth.jwt_secret,
        state.config.auth.token_ttl_days,
    )
    .map_err(|e| AppError::Internal(format!("JWT sign error: {}", e)))
}

#[utoipa::path(
    post,
    path = "/_matrix/client/v3/register",
    tag = "Accounts",
    operation_id = "register",
    summary = "Register a local account",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Account created", body = AuthResponse),
        (status = 400, description = "Invalid username or password (M_INVALID_PARAM), or taken (M_USER_IN_USE)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    validate_register_request(&payload)?;

    let user_id = UserId::new(&payload.username, &state.config.server.server_name);

    let hash = password::hash_password(&payload.password)
        .map_err(|e| AppError::Internal(format!("Password hash error: {}", e)))?;

    let new_user = user::ActiveModel {
        user_id: Set(user_id.to_string()),
        password: Set(hash),
        created_at: Set(chrono::Utc::now()),
    };

    new_user.insert(&state.db).await.map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::UserInUse,
        _ => AppError::from(e),
    })?;

    tracing::info!(user_id = %user_id, "registered user");

    Ok(Json(AuthResponse {
        access_token: issue_token(&state, user_id.as_str())?,
        user_id: user_id.to_string(),
    }))
}

#[utoipa::path(
    post,
    path = "/_matrix/client/v3/login",
    tag = "Accounts",
    operation_id = "login",
    summary = "Log in with a password",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 400, description = "Validation error (M_INVALID_PARAM)", body = ErrorBody),
        (status = 403, description = "Bad credentials (M_FORBIDDEN)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(user = %payload.user))]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    validate_login_request(&payload)?;

    let user = payload.user.trim();
    let user_id = if user.starts_with('@') {
        UserId::parse(user).map_err(|_| AppError::InvalidCredentials)?
    } else {
        UserId::new(user, &state.config.server.server_name)
    };

    let account = user::Entity::find_by_id(user_id.to_string())
        .one(&state.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let is_valid = password::verify_password(&payload.password, &account.password)
        .map_err(|e| AppError::Internal(format!("Password verify error: {}", e)))?;

    if !is_valid {
        return Err(AppError::InvalidCredentials);
    }

    Ok(Json(AuthResponse {
        access_token: issue_token(&state, &account.user_id)?,
        user_id: account.user_id,
    }))
}

#[utoipa::path(
    get,
    path = "/_matrix/client/v3/account/whoami",
    tag = "Accounts",
    operation_id = "whoami",
    summary = "Identify the caller",
    responses(
        (status = 200, description = "Owner of the access token", body = WhoAmIResponse),
        (status = 401, description = "Unauthorized (M_MISSING_TOKEN, M_UNKNOWN_TOKEN)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(auth_user), fields(user_id = %auth_user.user_id))]
pub async fn whoami(auth_user: AuthUser) -> Json<WhoAmIResponse> {
    Json(WhoAmIResponse {
        user_id: auth_user.user_id.to_string(),
    })
}
