use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use ed25519_dalek::VerifyingKey;
use reqwest::{Client, Url};
use tracing::{debug, instrument, warn};

use super::FederationError;
use super::signing::parse_verify_key;
use crate::config::FederationConfig;
use crate::models::federation::ServerKeysResponse;

/// Minimum time between two key fetches from the same server.
const REFETCH_INTERVAL: Duration = Duration::from_secs(60);

/// Verify keys of remote servers, keyed by `(server_name, key_id)`.
///
/// A peer with keys pinned in config is trusted for exactly those keys and
/// is never asked for more. Other peers are asked via
/// `/_matrix/key/v2/server`, at most once per [`REFETCH_INTERVAL`], and a
/// key once learned is kept for the life of the process.
pub struct KeyRing {
    keys: DashMap<(String, String), VerifyingKey>,
    pinned: HashSet<String>,
    last_fetch: DashMap<String, Instant>,
    base_urls: Arc<HashMap<String, String>>,
    client: Client,
}

impl KeyRing {
    pub fn new(
        config: &FederationConfig,
        base_urls: Arc<HashMap<String, String>>,
        client: Client,
    ) -> Result<Self, FederationError> {
        let keys = DashMap::new();
        let mut pinned = HashSet::new();

        for peer in &config.peers {
            for (key_id, key_hex) in &peer.verify_keys {
                keys.insert(
                    (peer.server_name.clone(), key_id.clone()),
                    parse_verify_key(key_hex)?,
                );
                pinned.insert(peer.server_name.clone());
            }
        }

        Ok(Self {
            keys,
            pinned,
            last_fetch: DashMap::new(),
            base_urls,
            client,
        })
    }

    #[instrument(skip(self))]
    pub async fn verify_key(
        &self,
        server_name: &str,
        key_id: &str,
    ) -> Result<VerifyingKey, FederationError> {
        let cache_key = (server_name.to_owned(), key_id.to_owned());
        if let Some(key) = self.keys.get(&cache_key) {
            return Ok(*key);
        }

        if self.pinned.contains(server_name) {
            return Err(FederationError::InvalidKey(format!(
                "{key_id} is not pinned for {server_name}"
            )));
        }
        let base_url = self
            .base_urls
            .get(server_name)
            .ok_or_else(|| FederationError::UnknownDestination(server_name.to_owned()))?;

        if self.claim_fetch(server_name) {
            self.fetch_keys(server_name, base_url).await?;
        } else {
            debug!("key fetch for {server_name} attempted recently; not asking again");
        }

        self.keys
            .get(&cache_key)
            .map(|key| *key)
            .ok_or_else(|| {
                FederationError::InvalidKey(format!("{server_name} does not publish {key_id}"))
            })
    }

    /// Record a fetch attempt unless one happened within the interval.
    fn claim_fetch(&self, server_name: &str) -> bool {
        let now = Instant::now();
        match self.last_fetch.entry(server_name.to_owned()) {
            Entry::Occupied(last) if now.duration_since(*last.get()) < REFETCH_INTERVAL => false,
            Entry::Occupied(mut last) => {
                last.insert(now);
                true
            }
            Entry::Vacant(slot) => {
                slot.insert(now);
                true
            }
        }
    }

    async fn fetch_keys(&self, server_name: &str, base_url: &str) -> Result<(), FederationError> {
        let url = Url::parse(base_url)
            .and_then(|base| base.join("/_matrix/key/v2/server"))
            .map_err(|e| FederationError::InvalidUrl(e.to_string()))?;

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(FederationError::Status(response.status().as_u16()));
        }
        let published: ServerKeysResponse = response.json().await?;

        if published.server_name != server_name {
            return Err(FederationError::InvalidKey(format!(
                "{server_name} published keys for {}",
                published.server_name
            )));
        }

        for (key_id, key) in published.verify_keys {
            let key = parse_verify_key(&key.key)?;
            match self.keys.entry((server_name.to_owned(), key_id.clone())) {
                Entry::Occupied(known) if *known.get() != key => {
                    warn!(server_name, %key_id, "ignoring changed key for a known key id");
                }
                Entry::Occupied(_) => {}
                Entry::Vacant(slot) => {
                    debug!(server_name, %key_id, "caching remote verify key");
                    slot.insert(key);
                }
            }
        }
        Ok(())
    }
}
