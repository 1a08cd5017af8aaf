use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "media")]
pub struct Model {
    /// Server-assigned id, the path segment of `mxc://<server_name>/<media_id>`.
    #[sea_orm(primary_key, auto_increment = false)]
    pub media_id: String,

    /// SHA-256 of the bytes; key into the blob store.
    pub content_hash: String,

    pub content_type: Option<String>,

    /// Filename supplied by the uploader.
    pub upload_name: Option<String>,

    pub size: i64,

    pub uploader: String,
    #[sea_orm(belongs_to, from = "uploader", to = "user_id")]
    pub uploader_ref: HasOne<super::user::Entity>,

    /// Computed at upload time on request. Never changes afterwards.
    pub blurhash: Option<String>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
