use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::BufReader;

use super::error::StorageError;
use super::hash::ContentHash;
use super::traits::{BlobStore, BoxReader};

/// Media blobs on local disk, sharded Git-style:
/// `{base_path}/{first 2 hex chars}/{remaining 62 hex chars}`.
pub struct FilesystemBlobStore {
    base_path: PathBuf,
    max_size: u64,
}

impl FilesystemBlobStore {
    pub async fn new(base_path: PathBuf, max_size: u64) -> Result<Self, StorageError> {
        fs::create_dir_all(base_path.join(".tmp")).await?;
        Ok(Self {
            base_path,
            max_size,
        })
    }

    fn blob_path(&self, hash: &ContentHash) -> PathBuf {
        self.base_path
            .join(hash.shard_prefix())
            .join(hash.shard_suffix())
    }

    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(".tmp")
            .join(uuid::Uuid::new_v4().to_string())
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn put(&self, data: &[u8]) -> Result<ContentHash, StorageError> {
        let size = data.len() as u64;
        if size > self.max_size {
            return Err(StorageError::SizeLimitExceeded {
                actual: size,
                limit: self.max_size,
            });
        }

        let hash = ContentHash::compute(data);
        let blob_path = self.blob_path(&hash);
        if fs::try_exists(&blob_path).await? {
            return Ok(hash);
        }

        // Write-then-rename so concurrent readers never observe a partial blob.
        let temp_path = self.temp_path();
        if let Err(e) = fs::write(&temp_path, data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        if let Some(parent) = blob_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        if let Err(e) = fs::rename(&temp_path, &blob_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        tracing::debug!(%hash, size, "stored media blob");
        Ok(hash)
    }

    async fn get_stream(&self, hash: &ContentHash) -> Result<BoxReader, StorageError> {
        match fs::File::open(self.blob_path(hash)).await {
            Ok(file) => Ok(Box::new(BufReader::new(file))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(hash.to_hex()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
