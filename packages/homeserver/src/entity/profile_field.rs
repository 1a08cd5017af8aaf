use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One row per (user, field). Keeping fields in separate rows lets writes to
/// different fields of the same profile proceed without touching each other.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "profile_field")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,
    #[sea_orm(belongs_to, from = "user_id", to = "user_id")]
    pub user: HasOne<super::user::Entity>,

    /// Wire name of the field, e.g. `avatar_url`.
    #[sea_orm(primary_key, auto_increment = false)]
    pub field: String,

    pub value: String,

    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
