//! Blurhash generation for uploaded media.
//!
//! Generation is best-effort: any failure is logged and the upload proceeds
//! without a hash. Encoding is CPU-bound and runs on the blocking pool.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use axum::body::Bytes;
use common::blurhash::{self, BlurhashError, Components};
use common::storage::ContentHash;
use lru::LruCache;
use tracing::{debug, instrument, warn};

use crate::config::MediaConfig;

type CacheKey = (ContentHash, Components);

/// Hashes of recently encoded blobs, so re-uploads of the same bytes skip
/// the decode.
pub struct BlurhashCache {
    inner: Mutex<LruCache<CacheKey, String>>,
}

impl BlurhashCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<String> {
        self.inner.lock().ok()?.get(key).cloned()
    }

    pub fn insert(&self, key: CacheKey, hash: String) {
        if let Ok(mut cache) = self.inner.lock() {
            cache.put(key, hash);
        }
    }
}

pub struct BlurhashGenerator {
    components: Components,
    max_pixels: u64,
    cache: BlurhashCache,
}

impl BlurhashGenerator {
    pub fn new(config: &MediaConfig) -> Result<Self, BlurhashError> {
        Ok(Self {
            components: Components::new(
                config.blurhash_components_x,
                config.blurhash_components_y,
            )?,
            max_pixels: config.max_blurhash_pixels,
            cache: BlurhashCache::new(config.blurhash_cache_capacity),
        })
    }

    pub fn components(&self) -> Components {
        self.components
    }

    /// Compute the blurhash of an uploaded blob, or `None` if the bytes are
    /// not an image this server can decode.
    #[instrument(skip(self, data, content_type), fields(content_hash = %content_hash, size = data.len()))]
    pub async fn generate(
        &self,
        content_hash: ContentHash,
        data: Bytes,
        content_type: Option<String>,
    ) -> Option<String> {
        let key = (content_hash, self.components);
        if let Some(hash) = self.cache.get(&key) {
            debug!("blurhash cache hit");
            return Some(hash);
        }

        let components = self.components;
        let max_pixels = self.max_pixels;
        let result = tokio::task::spawn_blocking(move || {
            blurhash::encode_bytes(&data, content_type.as_deref(), components, max_pixels)
        })
        .await;

        match result {
            Ok(Ok(hash)) => {
                self.cache.insert(key, hash.clone());
                Some(hash)
            }
            Ok(Err(
                e @ (BlurhashError::UnsupportedImageFormat | BlurhashError::ImageTooLarge { .. }),
            )) => {
                debug!(error = %e, "skipping blurhash");
                None
            }
            Ok(Err(e)) => {
                warn!(error = %e, "blurhash generation failed");
                None
            }
            Err(e) => {
                warn!(error = %e, "blurhash task did not complete");
                None
            }
        }
    }
}
