use axum::{
    Json,
    extract::{Path, State},
};
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::profile::{Profile, ProfileUpdateRequest, validate_profile_update};
use crate::profile::{self, ProfileField};
use crate::state::AppState;
use crate::utils::identifiers::UserId;

fn parse_field(name: &str) -> Result<ProfileField, AppError> {
    ProfileField::parse(name)
        .ok_or_else(|| AppError::Validation(format!("Unknown profile field '{name}'")))
}

/// Profile of any user, local or remote.
async fn lookup(
    state: &AppState,
    user_id: &UserId,
    field: Option<ProfileField>,
) -> Result<Profile, AppError> {
    if state.is_local(user_id.server_name()) {
        let profile = profile::load_local_profile(&state.db, user_id.as_str()).await?;
        return Ok(match field {
            Some(field) => profile.only(field),
            None => profile,
        });
    }

    Ok(state.federation.query_profile(user_id, field).await?)
}

#[utoipa::path(
    get,
    path = "/_matrix/client/v3/profile/{user_id}",
    tag = "Profile",
    operation_id = "getProfile",
    summary = "Get a user's profile",
    description = "Returns the fields currently set on the profile. Users on other servers \
        are looked up over federation.",
    params(("user_id" = String, Path, description = "Fully qualified user id")),
    responses(
        (status = 200, description = "Profile", body = Profile),
        (status = 401, description = "Unauthorized (M_MISSING_TOKEN, M_UNKNOWN_TOKEN)", body = ErrorBody),
        (status = 404, description = "No such user (M_NOT_FOUND)", body = ErrorBody),
        (status = 502, description = "Remote server unreachable (M_UNKNOWN)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user))]
pub async fn get_profile(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Profile>, AppError> {
    let user_id = UserId::parse(&user_id)?;
    Ok(Json(lookup(&state, &user_id, None).await?))
}

#[utoipa::path(
    get,
    path = "/_matrix/client/v3/profile/{user_id}/{field}",
    tag = "Profile",
    operation_id = "getProfileField",
    summary = "Get one profile field",
    description = "`avatar_url` also returns the avatar's `xyz.amorgan.blurhash` when set.",
    params(
        ("user_id" = String, Path, description = "Fully qualified user id"),
        ("field" = String, Path, description = "`displayname`, `avatar_url` or `xyz.amorgan.blurhash`"),
    ),
    responses(
        (status = 200, description = "Requested field", body = Profile),
        (status = 400, description = "Unknown field (M_INVALID_PARAM)", body = ErrorBody),
        (status = 401, description = "Unauthorized (M_MISSING_TOKEN, M_UNKNOWN_TOKEN)", body = ErrorBody),
        (status = 404, description = "No such user (M_NOT_FOUND)", body = ErrorBody),
        (status = 502, description = "Remote server unreachable (M_UNKNOWN)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user))]
pub async fn get_profile_field(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path((user_id, field)): Path<(String, String)>,
) -> Result<Json<Profile>, AppError> {
    let user_id = UserId::parse(&user_id)?;
    let field = parse_field(&field)?;
    Ok(Json(lookup(&state, &user_id, Some(field)).await?))
}

#[utoipa::path(
    put,
    path = "/_matrix/client/v3/profile/{user_id}/{field}",
    tag = "Profile",
    operation_id = "setProfileField",
    summary = "Set profile fields",
    description = "The field named in the path must be present in the body. Any other profile \
        fields in the body are applied too, each independently; `null` clears a field. The \
        blurhash is stored exactly as given.",
    params(
        ("user_id" = String, Path, description = "Fully qualified user id; must be the caller"),
        ("field" = String, Path, description = "`displayname`, `avatar_url` or `xyz.amorgan.blurhash`"),
    ),
    request_body = ProfileUpdateRequest,
    responses(
        (status = 200, description = "Updated", body = serde_json::Value),
        (status = 400, description = "Invalid value or unknown field (M_INVALID_PARAM, M_BAD_JSON)", body = ErrorBody),
        (status = 401, description = "Unauthorized (M_MISSING_TOKEN, M_UNKNOWN_TOKEN)", body = ErrorBody),
        (status = 403, description = "Not the profile owner (M_FORBIDDEN)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(caller = %auth_user.user_id))]
pub async fn set_profile_field(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((user_id, field)): Path<(String, String)>,
    AppJson(payload): AppJson<ProfileUpdateRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user_id = UserId::parse(&user_id)?;
    let path_field = parse_field(&field)?;
    auth_user.require_self(&user_id)?;
    validate_profile_update(&payload, path_field)?;

    for (field, value) in payload.changes() {
        match value {
            Some(value) => profile::set_field(&state.db, user_id.as_str(), field, value).await?,
            None => profile::clear_field(&state.db, user_id.as_str(), field).await?,
        }
        tracing::debug!(field = field.as_str(), cleared = value.is_none(), "profile field written");
    }

    Ok(Json(serde_json::json!({})))
}
