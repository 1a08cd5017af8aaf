use std::collections::HashMap;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Name this homeserver is known by, the part after `:` in user ids.
    pub server_name: String,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    #[serde(default = "default_token_ttl_days")]
    pub token_ttl_days: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Directory holding media blobs.
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MediaConfig {
    /// Largest accepted upload body, in bytes.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size: u64,
    #[serde(default = "default_blurhash_components_x")]
    pub blurhash_components_x: u32,
    #[serde(default = "default_blurhash_components_y")]
    pub blurhash_components_y: u32,
    /// Images with more pixels than this are stored without a blurhash.
    #[serde(default = "default_max_blurhash_pixels")]
    pub max_blurhash_pixels: u64,
    #[serde(default = "default_blurhash_cache_capacity")]
    pub blurhash_cache_capacity: usize,
}

/// A remote homeserver this server talks to over federation.
#[derive(Debug, Deserialize, Clone)]
pub struct PeerConfig {
    pub server_name: String,
    /// Base URL requests to this server are sent to, e.g. `https://hs2.example:8448`.
    pub base_url: String,
    /// Pinned verify keys (key id → hex). When empty, keys are fetched on demand.
    #[serde(default)]
    pub verify_keys: HashMap<String, String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FederationConfig {
    /// Hex-encoded Ed25519 seed. A throwaway key is generated when unset.
    pub signing_key: Option<String>,
    #[serde(default = "default_key_id")]
    pub key_id: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub peers: Vec<PeerConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// One of `trace`, `debug`, `info`, `warn`, `error`.
    pub level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub federation: FederationConfig,
    pub logging: LoggingConfig,
}

fn default_token_ttl_days() -> i64 {
    7
}
fn default_max_upload_size() -> u64 {
    50 * 1024 * 1024
}
fn default_blurhash_components_x() -> u32 {
    4
}
fn default_blurhash_components_y() -> u32 {
    3
}
fn default_max_blurhash_pixels() -> u64 {
    40_000_000
}
fn default_blurhash_cache_capacity() -> usize {
    1024
}
fn default_key_id() -> String {
    "ed25519:auto".into()
}
fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            max_upload_size: default_max_upload_size(),
            blurhash_components_x: default_blurhash_components_x(),
            blurhash_components_y: default_blurhash_components_y(),
            max_blurhash_pixels: default_max_blurhash_pixels(),
            blurhash_cache_capacity: default_blurhash_cache_capacity(),
        }
    }
}

impl Default for FederationConfig {
    fn default() -> Self {
        Self {
            signing_key: None,
            key_id: default_key_id(),
            request_timeout_secs: default_request_timeout_secs(),
            peers: Vec::new(),
        }
    }
}

impl FederationConfig {
    /// `server_name -> base_url` for every configured peer.
    pub fn base_urls(&self) -> HashMap<String, String> {
        self.peers
            .iter()
            .map(|peer| (peer.server_name.clone(), peer.base_url.clone()))
            .collect()
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8008)?
            .set_default("server.server_name", "localhost")?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            .set_default("storage.path", "./media_store")?
            .set_default("media.max_upload_size", default_max_upload_size())?
            .set_default("federation.key_id", default_key_id())?
            .set_default("logging.level", "info")?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., HOMESERVER__AUTH__JWT_SECRET)
            .add_source(Environment::with_prefix("HOMESERVER").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
