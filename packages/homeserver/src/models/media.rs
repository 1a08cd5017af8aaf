use serde::{Deserialize, Serialize};

/// Query string of `POST /_matrix/media/v3/upload`.
#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UploadQuery {
    /// Name to remember for the file, echoed in `Content-Disposition` on download.
    #[param(example = "large.png")]
    pub filename: Option<String>,
    /// Compute a blurhash for the upload when it is an image.
    #[serde(rename = "xyz.amorgan.generate_blurhash", default)]
    pub generate_blurhash: bool,
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct UploadResponse {
    #[schema(example = "mxc://hs1/aBcDeFgHiJkLmNoPqRsTuVwX")]
    pub content_uri: String,
    /// Present only when requested and the upload could be decoded as an image.
    #[serde(
        rename = "xyz.amorgan.blurhash",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(example = "LEHV6nWB2yk8pyo0adR*.7kCMdnj")]
    pub blurhash: Option<String>,
}
