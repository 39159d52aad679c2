use std::collections::HashMap;

use fab_types::ContentKey;
use parking_lot::RwLock;

use crate::error::StoreResult;

/// Object-storage collaborator underneath the [`ContentStore`](crate::ContentStore).
///
/// Backends are dumb key-value stores: they never hash, verify, or interpret
/// what they hold. Implementations must satisfy:
/// - `put` of a key that already exists overwrites it (callers only ever
///   rewrite identical bytes, so this is safe).
/// - Concurrent `put`s of the same key must not leave a torn value behind.
/// - All I/O errors are propagated, never silently ignored.
pub trait BlobBackend: Send + Sync {
    /// Name of the bucket this backend writes into.
    fn bucket(&self) -> &str;

    /// Create the bucket if it does not exist yet.
    fn ensure_bucket(&self) -> StoreResult<()>;

    /// Persist `data` under `key`.
    fn put(&self, key: &ContentKey, data: &[u8]) -> StoreResult<()>;

    /// Read the bytes stored under `key`.
    ///
    /// Returns `Ok(None)` if nothing is stored there.
    fn get(&self, key: &ContentKey) -> StoreResult<Option<Vec<u8>>>;

    /// Check whether anything is stored under `key`.
    ///
    /// Default implementation reads the blob. Backends may override with a
    /// cheaper metadata lookup.
    fn exists(&self, key: &ContentKey) -> StoreResult<bool> {
        Ok(self.get(key)?.is_some())
    }
}

/// In-memory, HashMap-based blob backend.
///
/// Intended for tests and embedding. Blobs are cloned on read and write.
pub struct InMemoryBlobBackend {
    bucket: String,
    blobs: RwLock<HashMap<ContentKey, Vec<u8>>>,
}

impl InMemoryBlobBackend {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            blobs: RwLock::new(HashMap::new()),
        }
    }

    /// Number of blobs currently stored.
    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    /// Returns `true` if the backend holds no blobs.
    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }

    /// Total bytes across all stored blobs.
    pub fn total_bytes(&self) -> u64 {
        self.blobs.read().values().map(|b| b.len() as u64).sum()
    }
}

impl Default for InMemoryBlobBackend {
    fn default() -> Self {
        Self::new("memory")
    }
}

impl BlobBackend for InMemoryBlobBackend {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn ensure_bucket(&self) -> StoreResult<()> {
        Ok(())
    }

    fn put(&self, key: &ContentKey, data: &[u8]) -> StoreResult<()> {
        self.blobs.write().insert(*key, data.to_vec());
        Ok(())
    }

    fn get(&self, key: &ContentKey) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.blobs.read().get(key).cloned())
    }

    fn exists(&self, key: &ContentKey) -> StoreResult<bool> {
        Ok(self.blobs.read().contains_key(key))
    }
}

impl std::fmt::Debug for InMemoryBlobBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBlobBackend")
            .field("bucket", &self.bucket)
            .field("blob_count", &self.len())
            .finish()
    }
}
