use std::fmt;

use sha2::{Digest, Sha256};

use super::error::StorageError;

/// SHA-256 digest of a media blob. Identifies bytes, not uploads: two uploads
/// of the same file share one hash but get distinct media ids.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    pub fn compute(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    /// Parse the 64-character hex form stored in `media.content_hash`.
    pub fn from_hex(s: &str) -> Result<Self, StorageError> {
        if s.len() != 64 {
            return Err(StorageError::InvalidHash(format!(
                "expected 64 hex characters, got {}",
                s.len()
            )));
        }

        let bytes =
            hex::decode(s).map_err(|e| StorageError::InvalidHash(format!("invalid hex: {e}")))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| StorageError::InvalidHash("decoded to wrong length".into()))?;

        Ok(Self(arr))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Directory shard: first byte as two hex characters.
    pub(crate) fn shard_prefix(&self) -> String {
        hex::encode(&self.0[..1])
    }

    /// File name within the shard: the remaining 62 hex characters.
    pub(crate) fn shard_suffix(&self) -> String {
        hex::encode(&self.0[1..])
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.to_hex())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
