use async_trait::async_trait;
use tokio::io::AsyncRead;

use super::error::StorageError;
use super::hash::ContentHash;

pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// Content-addressed storage for uploaded media bytes.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes and return their content hash. Storing the same bytes
    /// twice is a no-op that returns the same hash.
    async fn put(&self, data: &[u8]) -> Result<ContentHash, StorageError>;

    /// Open a blob for streaming.
    async fn get_stream(&self, hash: &ContentHash) -> Result<BoxReader, StorageError>;
}
