use std::fmt;

use rand::Rng;
use rand::distr::Alphanumeric;

use crate::error::AppError;

/// Random opaque id made of ASCII letters and digits.
pub fn random_string(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// A fully qualified user id, `@localpart:server_name`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserId {
    full: String,
    colon: usize,
}

impl UserId {
    pub fn new(localpart: &str, server_name: &str) -> Self {
        Self {
            full: format!("@{localpart}:{server_name}"),
            colon: localpart.len() + 1,
        }
    }

    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let invalid = || AppError::Validation(format!("Invalid user id '{raw}'"));

        let rest = raw.strip_prefix('@').ok_or_else(invalid)?;
        let (localpart, server_name) = rest.split_once(':').ok_or_else(invalid)?;
        if localpart.is_empty() || server_name.is_empty() || raw.len() > 255 {
            return Err(invalid());
        }

        Ok(Self::new(localpart, server_name))
    }

    pub fn localpart(&self) -> &str {
        &self.full[1..self.colon]
    }

    pub fn server_name(&self) -> &str {
        &self.full[self.colon + 1..]
    }

    pub fn as_str(&self) -> &str {
        &self.full
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full)
    }
}

/// Validate a localpart chosen at registration.
pub fn validate_localpart(localpart: &str) -> Result<(), AppError> {
    if localpart.is_empty() || localpart.len() > 64 {
        return Err(AppError::Validation(
            "Username must be 1-64 characters".into(),
        ));
    }
    if !localpart
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '=' | '-'))
    {
        return Err(AppError::Validation(
            "Username may only contain a-z, 0-9, '.', '_', '=' and '-'".into(),
        ));
    }
    Ok(())
}

/// Split `mxc://<server_name>/<media_id>` into its parts.
pub fn parse_mxc(uri: &str) -> Option<(&str, &str)> {
    let rest = uri.strip_prefix("mxc://")?;
    let (server_name, media_id) = rest.split_once('/')?;
    let valid_id = !media_id.is_empty()
        && media_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'));
    (!server_name.is_empty() && valid_id).then_some((server_name, media_id))
}

pub fn mxc_uri(server_name: &str, media_id: &str) -> String {
    format!("mxc://{server_name}/{media_id}")
}
