//! Profile field store.
//!
//! Each field lives in its own `profile_field` row and is written with a
//! single statement, so concurrent writes to one field resolve as
//! last-write-wins at the database and writes to different fields never
//! contend. Values are stored as given; nothing here interprets them.

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set};

use crate::entity::{profile_field, user};
use crate::error::AppError;
use crate::models::profile::Profile;

/// Wire name of the blurhash attached to media and avatars.
pub const BLURHASH_FIELD: &str = "xyz.amorgan.blurhash";

/// The public profile fields. Nothing outside this set is ever stored or served.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProfileField {
    DisplayName,
    AvatarUrl,
    Blurhash,
}

impl ProfileField {
    pub const ALL: [ProfileField; 3] = [Self::DisplayName, Self::AvatarUrl, Self::Blurhash];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DisplayName => "displayname",
            Self::AvatarUrl => "avatar_url",
            Self::Blurhash => BLURHASH_FIELD,
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == name)
    }
}

pub async fn user_exists<C: ConnectionTrait>(db: &C, user_id: &str) -> Result<bool, DbErr> {
    Ok(user::Entity::find_by_id(user_id.to_owned())
        .one(db)
        .await?
        .is_some())
}

/// Overwrite one field.
pub async fn set_field<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    field: ProfileField,
    value: &str,
) -> Result<(), DbErr> {
    let row = profile_field::ActiveModel {
        user_id: Set(user_id.to_owned()),
        field: Set(field.as_str().to_owned()),
        value: Set(value.to_owned()),
        updated_at: Set(Utc::now()),
    };

    profile_field::Entity::insert(row)
        .on_conflict(
            OnConflict::columns([profile_field::Column::UserId, profile_field::Column::Field])
                .update_columns([profile_field::Column::Value, profile_field::Column::UpdatedAt])
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    Ok(())
}

/// Remove one field. Clearing an unset field is a no-op.
pub async fn clear_field<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    field: ProfileField,
) -> Result<(), DbErr> {
    profile_field::Entity::delete_by_id((user_id.to_owned(), field.as_str().to_owned()))
        .exec(db)
        .await?;
    Ok(())
}

/// Read whatever subset of fields is currently set.
pub async fn load_profile<C: ConnectionTrait>(db: &C, user_id: &str) -> Result<Profile, DbErr> {
    let rows = profile_field::Entity::find()
        .filter(profile_field::Column::UserId.eq(user_id))
        .all(db)
        .await?;

    let mut profile = Profile::default();
    for row in rows {
        match ProfileField::parse(&row.field) {
            Some(field) => profile.set(field, row.value),
            None => tracing::warn!(user_id, field = %row.field, "ignoring unknown profile field"),
        }
    }
    Ok(profile)
}

/// Profile of a user registered on this server.
pub async fn load_local_profile<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
) -> Result<Profile, AppError> {
    if !user_exists(db, user_id).await? {
        return Err(AppError::NotFound("Profile not found".into()));
    }
    Ok(load_profile(db, user_id).await?)
}
