use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Query for `GET /_matrix/federation/v1/query/profile`.
#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProfileQuery {
    /// Fully qualified id of a user on this server.
    #[param(example = "@alice:hs1")]
    pub user_id: String,
    /// Restrict the response to one field.
    #[param(example = "avatar_url")]
    pub field: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct VerifyKey {
    /// Hex-encoded Ed25519 public key.
    pub key: String,
}

/// Signing keys this server publishes for request verification.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ServerKeysResponse {
    #[schema(example = "hs1")]
    pub server_name: String,
    /// Key id → key.
    pub verify_keys: BTreeMap<String, VerifyKey>,
    /// Milliseconds since the Unix epoch after which the keys should be refetched.
    pub valid_until_ts: i64,
}
