use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub const INVITE: &str = "invite";
pub const JOIN: &str = "join";

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "room_membership")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub room_id: String,
    #[sea_orm(belongs_to, from = "room_id", to = "room_id")]
    pub room: HasOne<super::room::Entity>,

    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,

    /// Current membership: `invite` or `join`.
    pub membership: String,

    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
