use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::shared::double_option;
use crate::profile::ProfileField;
use crate::utils::identifiers::parse_mxc;

/// Public profile of a user. Unset fields are omitted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "Alice")]
    pub displayname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "mxc://hs1/aBcDeFgHiJkLmNoPqRsTuVwX")]
    pub avatar_url: Option<String>,
    /// Client-supplied placeholder for the avatar. Never validated.
    #[serde(
        rename = "xyz.amorgan.blurhash",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(example = "LEHV6nWB2yk8pyo0adR*.7kCMdnj")]
    pub blurhash: Option<String>,
}

impl Profile {
    pub fn set(&mut self, field: ProfileField, value: String) {
        *self.slot(field) = Some(value);
    }

    fn slot(&mut self, field: ProfileField) -> &mut Option<String> {
        match field {
            ProfileField::DisplayName => &mut self.displayname,
            ProfileField::AvatarUrl => &mut self.avatar_url,
            ProfileField::Blurhash => &mut self.blurhash,
        }
    }

    /// Restrict to what a single-field read returns. The avatar's blurhash
    /// travels with `avatar_url`.
    pub fn only(self, field: ProfileField) -> Self {
        match field {
            ProfileField::DisplayName => Self {
                displayname: self.displayname,
                ..Self::default()
            },
            ProfileField::AvatarUrl => Self {
                avatar_url: self.avatar_url,
                blurhash: self.blurhash,
                ..Self::default()
            },
            ProfileField::Blurhash => Self {
                blurhash: self.blurhash,
                ..Self::default()
            },
        }
    }
}

/// Body of `PUT /profile/{user_id}/{field}`.
///
/// Each key is tri-state: absent leaves the field alone, `null` clears it,
/// a string overwrites it.
#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
pub struct ProfileUpdateRequest {
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>, example = "Alice")]
    pub displayname: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>, example = "mxc://hs1/aBcDeFgHiJkLmNoPqRsTuVwX")]
    pub avatar_url: Option<Option<String>>,
    #[serde(rename = "xyz.amorgan.blurhash", default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>, example = "LEHV6nWB2yk8pyo0adR*.7kCMdnj")]
    pub blurhash: Option<Option<String>>,
}

impl ProfileUpdateRequest {
    /// Fields present in the body, in a fixed order.
    pub fn changes(&self) -> Vec<(ProfileField, Option<&str>)> {
        [
            (ProfileField::DisplayName, &self.displayname),
            (ProfileField::AvatarUrl, &self.avatar_url),
            (ProfileField::Blurhash, &self.blurhash),
        ]
        .into_iter()
        .filter_map(|(field, change)| change.as_ref().map(|v| (field, v.as_deref())))
        .collect()
    }
}

pub fn validate_profile_update(
    payload: &ProfileUpdateRequest,
    path_field: ProfileField,
) -> Result<(), AppError> {
    let changes = payload.changes();
    if !changes.iter().any(|(field, _)| *field == path_field) {
        return Err(AppError::BadJson(format!(
            "Missing key '{}'",
            path_field.as_str()
        )));
    }

    for (field, value) in changes {
        let Some(value) = value else { continue };
        match field {
            ProfileField::DisplayName if value.chars().count() > 256 => {
                return Err(AppError::Validation(
                    "Display name must be at most 256 characters".into(),
                ));
            }
            ProfileField::AvatarUrl if value.len() > 1000 || parse_mxc(value).is_none() => {
                return Err(AppError::Validation(
                    "avatar_url must be an mxc:// URI".into(),
                ));
            }
            _ => {}
        }
    }
    Ok(())
}
