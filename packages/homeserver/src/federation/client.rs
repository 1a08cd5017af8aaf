use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, StatusCode, Url, header};
use tracing::instrument;

use super::signing::{RequestToSign, ServerKey};
use super::FederationError;
use crate::config::FederationConfig;
use crate::models::profile::Profile;
use crate::profile::ProfileField;
use crate::utils::identifiers::UserId;

/// Signed outbound requests to peer homeservers.
#[derive(Clone)]
pub struct FederationClient {
    client: Client,
    origin: String,
    key: Arc<ServerKey>,
    base_urls: Arc<HashMap<String, String>>,
}

impl FederationClient {
    pub fn new(
        origin: &str,
        key: Arc<ServerKey>,
        base_urls: Arc<HashMap<String, String>>,
        client: Client,
    ) -> Self {
        Self {
            client,
            origin: origin.to_owned(),
            key,
            base_urls,
        }
    }

    /// HTTP client shared by outbound federation calls.
    pub fn http_client(config: &FederationConfig) -> Result<Client, FederationError> {
        Ok(Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?)
    }

    /// Ask the user's homeserver for their profile.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn query_profile(
        &self,
        user_id: &UserId,
        field: Option<ProfileField>,
    ) -> Result<Profile, FederationError> {
        let destination = user_id.server_name();
        let base_url = self
            .base_urls
            .get(destination)
            .ok_or_else(|| FederationError::UnknownDestination(destination.to_owned()))?;

        let mut url = Url::parse(base_url)
            .and_then(|base| base.join("/_matrix/federation/v1/query/profile"))
            .map_err(|e| FederationError::InvalidUrl(e.to_string()))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("user_id", user_id.as_str());
            if let Some(field) = field {
                query.append_pair("field", field.as_str());
            }
        }

        let response = self.signed_get(destination, url).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(FederationError::NotFound),
            status if !status.is_success() => Err(FederationError::Status(status.as_u16())),
            _ => Ok(response.json().await?),
        }
    }

    async fn signed_get(
        &self,
        destination: &str,
        url: Url,
    ) -> Result<reqwest::Response, FederationError> {
        let uri = match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_owned(),
        };
        let authorization = self.key.authorize(&RequestToSign {
            destination,
            method: "GET",
            origin: &self.origin,
            uri: &uri,
        });

        Ok(self
            .client
            .get(url)
            .header(header::AUTHORIZATION, authorization)
            .send()
            .await?)
    }
}
