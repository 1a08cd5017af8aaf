use std::path::PathBuf;
use std::sync::Arc;

use common::storage::BlobStore;
use common::storage::filesystem::FilesystemBlobStore;
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::federation::{FederationClient, KeyRing, ServerKey};
use crate::ingest::BlurhashGenerator;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<AppConfig>,
    pub blob_store: Arc<dyn BlobStore>,
    pub blurhash: Arc<BlurhashGenerator>,
    pub server_key: Arc<ServerKey>,
    pub keyring: Arc<KeyRing>,
    pub federation: FederationClient,
}

impl AppState {
    pub async fn new(config: AppConfig, db: DatabaseConnection) -> anyhow::Result<Self> {
        let blob_store = FilesystemBlobStore::new(
            PathBuf::from(&config.storage.path),
            config.media.max_upload_size,
        )
        .await?;
        let blurhash = BlurhashGenerator::new(&config.media)?;

        let server_key = Arc::new(ServerKey::from_config(&config.federation)?);
        let http = FederationClient::http_client(&config.federation)?;
        let base_urls = Arc::new(config.federation.base_urls());
        let keyring = KeyRing::new(&config.federation, base_urls.clone(), http.clone())?;
        let federation = FederationClient::new(
            &config.server.server_name,
            server_key.clone(),
            base_urls,
            http,
        );

        tracing::info!(
            server_name = %config.server.server_name,
            key_id = server_key.key_id(),
            verify_key = %server_key.verify_key_hex(),
            peers = config.federation.peers.len(),
            "homeserver state initialised"
        );

        Ok(Self {
            db,
            config: Arc::new(config),
            blob_store: Arc::new(blob_store),
            blurhash: Arc::new(blurhash),
            server_key,
            keyring: Arc::new(keyring),
            federation,
        })
    }

    pub fn is_local(&self, server_name: &str) -> bool {
        self.config.server.server_name == server_name
    }
}
