use axum::body::{Body, Bytes};
use axum::extract::rejection::BytesRejection;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::Json;
use common::storage::ContentHash;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use tokio_util::io::ReaderStream;
use tracing::instrument;

use crate::entity::media;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppQuery;
use crate::models::media::{UploadQuery, UploadResponse};
use crate::state::AppState;
use crate::utils::filename::{content_disposition_value, validate_upload_name};
use crate::utils::identifiers::{mxc_uri, random_string};

pub fn media_upload_body_limit(max_upload_size: u64) -> DefaultBodyLimit {
    DefaultBodyLimit::max(usize::try_from(max_upload_size).unwrap_or(usize::MAX))
}

#[utoipa::path(
    post,
    path = "/_matrix/media/v3/upload",
    tag = "Media",
    operation_id = "uploadMedia",
    summary = "Upload media",
    description = "Stores the raw request body and returns its `mxc://` URI. With \
        `xyz.amorgan.generate_blurhash=true` the server also computes a blurhash for \
        image uploads and returns it under `xyz.amorgan.blurhash`. Blurhash generation \
        is best-effort: if the body cannot be decoded as an image the upload still \
        succeeds and the field is simply absent.",
    params(UploadQuery),
    request_body(content = Vec<u8>, content_type = "application/octet-stream"),
    responses(
        (status = 200, description = "Stored", body = UploadResponse),
        (status = 400, description = "Invalid filename or empty body (M_INVALID_PARAM)", body = ErrorBody),
        (status = 401, description = "Unauthorized (M_MISSING_TOKEN, M_UNKNOWN_TOKEN)", body = ErrorBody),
        (status = 413, description = "Body exceeds media.max_upload_size (M_TOO_LARGE)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(
    skip(state, auth_user, query, headers, body),
    fields(user_id = %auth_user.user_id, generate_blurhash = query.generate_blurhash)
)]
pub async fn upload_media(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<UploadQuery>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let limit = state.config.media.max_upload_size;
    let body = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::TooLarge { limit }
        } else {
            AppError::Validation(rejection.body_text())
        }
    })?;
    if body.is_empty() {
        return Err(AppError::Validation("Upload body is empty".into()));
    }

    let upload_name = query
        .filename
        .as_deref()
        .map(validate_upload_name)
        .transpose()
        .map_err(|e| AppError::Validation(e.message().into()))?
        .map(str::to_owned);

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .or_else(|| {
            upload_name
                .as_deref()
                .and_then(|name| mime_guess::from_path(name).first())
                .map(|mime| mime.to_string())
        });

    let content_hash = state.blob_store.put(&body).await?;

    let blurhash = if query.generate_blurhash {
        state
            .blurhash
            .generate(content_hash, body.clone(), content_type.clone())
            .await
    } else {
        None
    };

    let media_id = random_string(24);
    let row = media::ActiveModel {
        media_id: Set(media_id.clone()),
        content_hash: Set(content_hash.to_hex()),
        content_type: Set(content_type),
        upload_name: Set(upload_name),
        size: Set(body.len() as i64),
        uploader: Set(auth_user.user_id.to_string()),
        blurhash: Set(blurhash.clone()),
        created_at: Set(chrono::Utc::now()),
    };
    row.insert(&state.db).await?;

    tracing::info!(
        media_id = %media_id,
        size = body.len(),
        has_blurhash = blurhash.is_some(),
        "stored upload"
    );

    Ok(Json(UploadResponse {
        content_uri: mxc_uri(&state.config.server.server_name, &media_id),
        blurhash,
    }))
}

#[utoipa::path(
    get,
    path = "/_matrix/media/v3/download/{server_name}/{media_id}",
    tag = "Media",
    operation_id = "downloadMedia",
    summary = "Download media",
    description = "Streams media previously uploaded to this server. Supports `If-None-Match` \
        against the returned `ETag`. Media held by other servers is not proxied.",
    params(
        ("server_name" = String, Path, description = "Server part of the mxc URI"),
        ("media_id" = String, Path, description = "Media id part of the mxc URI"),
    ),
    responses(
        (status = 200, description = "Media bytes", content_type = "application/octet-stream"),
        (status = 304, description = "Not modified"),
        (status = 404, description = "Unknown media (M_NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, headers))]
pub async fn download_media(
    State(state): State<AppState>,
    Path((server_name, media_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    if !state.is_local(&server_name) {
        return Err(AppError::NotFound("Media not found".into()));
    }

    let media = media::Entity::find_by_id(media_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Media not found".into()))?;

    let etag_value = format!("\"{}\"", media.content_hash);
    if let Some(if_none_match) = headers.get(header::IF_NONE_MATCH)
        && let Ok(val) = if_none_match.to_str()
        && (val == etag_value || val == "*")
    {
        return Ok(StatusCode::NOT_MODIFIED.into_response());
    }

    let hash = ContentHash::from_hex(&media.content_hash)?;
    let reader = state.blob_store.get_stream(&hash).await?;
    let body = Body::from_stream(ReaderStream::new(reader));

    let content_type = media
        .content_type
        .as_deref()
        .unwrap_or("application/octet-stream");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, media.size.to_string())
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_value(media.upload_name.as_deref()),
        )
        .header(header::ETAG, &etag_value)
        .header(header::CACHE_CONTROL, "public, max-age=86400, immutable")
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}
