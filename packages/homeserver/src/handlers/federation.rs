use std::collections::BTreeMap;

use axum::{Json, extract::State};
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::federation::FederatedOrigin;
use crate::extractors::json::AppQuery;
use crate::models::federation::{ProfileQuery, ServerKeysResponse, VerifyKey};
use crate::models::profile::Profile;
use crate::profile::{self, ProfileField};
use crate::state::AppState;
use crate::utils::identifiers::UserId;

/// How long remote servers may cache our published key.
const KEY_VALIDITY_MS: i64 = 24 * 60 * 60 * 1000;

#[utoipa::path(
    get,
    path = "/_matrix/federation/v1/query/profile",
    tag = "Federation",
    operation_id = "federationQueryProfile",
    summary = "Profile lookup for remote servers",
    description = "Returns the public profile of a user on this server. The caller is a \
        homeserver authenticated by an `X-Matrix` request signature, not a user.",
    params(ProfileQuery),
    responses(
        (status = 200, description = "Profile", body = Profile),
        (status = 400, description = "Unknown field (M_INVALID_PARAM)", body = ErrorBody),
        (status = 401, description = "Missing or invalid signature (M_UNAUTHORIZED)", body = ErrorBody),
        (status = 404, description = "Not a user of this server (M_NOT_FOUND)", body = ErrorBody),
    ),
    security(("x_matrix" = [])),
)]
#[instrument(skip(state, origin, query), fields(origin = %origin.0, user_id = %query.user_id))]
pub async fn query_profile(
    origin: FederatedOrigin,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ProfileQuery>,
) -> Result<Json<Profile>, AppError> {
    let field = query
        .field
        .as_deref()
        .map(|name| {
            ProfileField::parse(name)
                .ok_or_else(|| AppError::Validation(format!("Unknown profile field '{name}'")))
        })
        .transpose()?;

    let user_id = UserId::parse(&query.user_id)
        .map_err(|_| AppError::NotFound("Profile not found".into()))?;
    if !state.is_local(user_id.server_name()) {
        return Err(AppError::NotFound("Profile not found".into()));
    }

    let profile = profile::load_local_profile(&state.db, user_id.as_str()).await?;
    Ok(Json(match field {
        Some(field) => profile.only(field),
        None => profile,
    }))
}

#[utoipa::path(
    get,
    path = "/_matrix/key/v2/server",
    tag = "Federation",
    operation_id = "serverKeys",
    summary = "Publish this server's verify keys",
    responses(
        (status = 200, description = "Signing keys", body = ServerKeysResponse),
    ),
)]
#[instrument(skip(state))]
pub async fn server_keys(State(state): State<AppState>) -> Json<ServerKeysResponse> {
    let verify_keys = BTreeMap::from([(
        state.server_key.key_id().to_owned(),
        VerifyKey {
            key: state.server_key.verify_key_hex(),
        },
    )]);

    Json(ServerKeysResponse {
        server_name: state.config.server.server_name.clone(),
        verify_keys,
        valid_until_ts: chrono::Utc::now().timestamp_millis() + KEY_VALIDITY_MS,
    })
}
