use anyhow::{Result, anyhow};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// Access token claims.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Fully qualified user id
    pub exp: usize,  // Expiration timestamp
}

/// Issue an access token for a user.
pub fn sign(user_id: &str, secret: &str, ttl_days: i64) -> Result<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::days(ttl_days))
        .ok_or_else(|| anyhow!("token expiry out of range"))?
        .timestamp();

    let claims = Claims {
        sub: user_id.to_owned(),
        exp: expiration as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Verify and decode an access token.
pub fn verify(token: &str, secret: &str) -> Result<Claims> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}
