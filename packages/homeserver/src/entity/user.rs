use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    /// Fully qualified id, `@localpart:server_name`.
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,

    /// Argon2 PHC string.
    pub password: String,

    #[sea_orm(has_many)]
    pub profile_fields: HasMany<super::profile_field::Entity>,

    #[sea_orm(has_many)]
    pub uploads: HasMany<super::media::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
