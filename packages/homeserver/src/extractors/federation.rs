use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::{header, request::Parts},
};
use tracing::warn;

use crate::error::AppError;
use crate::federation::signing::{RequestToSign, XMatrix, verify_request};
use crate::state::AppState;

/// A remote homeserver that signed this request with a key we trust.
///
/// Verification covers method, path and query, origin and destination.
/// Requests addressed to another server name are refused.
pub struct FederatedOrigin(pub String);

impl FromRequestParts<AppState> for FederatedOrigin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Missing X-Matrix authorization".into()))?;

        let auth = XMatrix::parse(header)
            .ok_or_else(|| AppError::Unauthorized("Malformed X-Matrix authorization".into()))?;

        if auth.destination != state.config.server.server_name {
            return Err(AppError::Unauthorized(format!(
                "Request is addressed to '{}'",
                auth.destination
            )));
        }

        let key = state
            .keyring
            .verify_key(&auth.origin, &auth.key_id)
            .await
            .map_err(|e| {
                warn!(origin = %auth.origin, key_id = %auth.key_id, error = %e, "cannot resolve verify key");
                AppError::Unauthorized(format!("Unknown key {} for {}", auth.key_id, auth.origin))
            })?;

        // Nested routers see a stripped uri; the signature covers the full one.
        let uri = parts
            .extensions
            .get::<OriginalUri>()
            .map(|original| &original.0)
            .unwrap_or(&parts.uri);
        let path_and_query = uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or_else(|| uri.path());

        let request = RequestToSign {
            destination: &auth.destination,
            method: parts.method.as_str(),
            origin: &auth.origin,
            uri: path_and_query,
        };
        if !verify_request(&key, &request, &auth.sig) {
            warn!(origin = %auth.origin, uri = path_and_query, "rejecting badly signed request");
            return Err(AppError::Unauthorized("Invalid request signature".into()));
        }

        Ok(FederatedOrigin(auth.origin))
    }
}
