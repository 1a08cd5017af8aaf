use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "room")]
pub struct Model {
    /// `!opaque:server_name`
    #[sea_orm(primary_key, auto_increment = false)]
    pub room_id: String,

    pub creator: String,

    pub name: Option<String>,

    /// Anyone may join without an invite.
    pub is_public: bool,

    #[sea_orm(has_many)]
    pub memberships: HasMany<super::room_membership::Entity>,

    #[sea_orm(has_many)]
    pub events: HasMany<super::room_event::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
