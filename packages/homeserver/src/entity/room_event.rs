use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "room_event")]
pub struct Model {
    /// Stream ordering. Pagination tokens are this value.
    #[sea_orm(primary_key)]
    pub id: i32,

    /// `$opaque`
    #[sea_orm(unique)]
    pub event_id: String,

    pub room_id: String,
    #[sea_orm(belongs_to, from = "room_id", to = "room_id")]
    pub room: HasOne<super::room::Entity>,

    pub sender: String,

    pub event_type: String,

    pub state_key: Option<String>,

    /// Client transaction id, set for events sent through `/send`.
    pub txn_id: Option<String>,

    /// Client-authored content, stored exactly as received.
    #[sea_orm(column_type = "JsonBinary")]
    pub content: serde_json::Value,

    /// Milliseconds since the Unix epoch.
    pub origin_server_ts: i64,
}

impl ActiveModelBehavior for ActiveModel {}
