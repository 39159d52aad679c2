use std::sync::Arc;

use fab_crypto::ContentHasher;
use fab_types::ContentKey;

use crate::backend::{BlobBackend, InMemoryBlobBackend};
use crate::error::{StoreError, StoreResult};
use crate::render::{MarkdownRenderer, Renderer};

/// How fetched content should be returned.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum View {
    /// The stored bytes, unchanged.
    #[default]
    Raw,
    /// The stored bytes passed through the store's [`Renderer`].
    Rendered,
}

impl From<bool> for View {
    fn from(render: bool) -> Self {
        if render {
            View::Rendered
        } else {
            View::Raw
        }
    }
}

/// Content-addressed blob store.
///
/// `store` hashes the bytes, writes them under the hash, and returns the
/// hash. `fetch` reads them back, verifies the hash, and optionally renders.
/// Keys are a pure function of content, so writes need no coordination:
/// racing writers of the same bytes write the same value to the same key.
pub struct ContentStore {
    backend: Arc<dyn BlobBackend>,
    renderer: Arc<dyn Renderer>,
    hasher: ContentHasher,
    max_blob_size: usize,
}

impl ContentStore {
    /// Default payload ceiling: 16 MiB.
    pub const DEFAULT_MAX_BLOB_SIZE: usize = 16 * 1024 * 1024;

    /// Create a store over `backend`, creating its bucket if absent.
    pub fn new(backend: Arc<dyn BlobBackend>) -> StoreResult<Self> {
        backend.ensure_bucket()?;
        tracing::debug!(bucket = backend.bucket(), "content store ready");
        Ok(Self {
            backend,
            renderer: Arc::new(MarkdownRenderer),
            hasher: ContentHasher::BLOB,
            max_blob_size: Self::DEFAULT_MAX_BLOB_SIZE,
        })
    }

    /// A store over a fresh in-memory backend.
    pub fn in_memory() -> Self {
        Self {
            backend: Arc::new(InMemoryBlobBackend::default()),
            renderer: Arc::new(MarkdownRenderer),
            hasher: ContentHasher::BLOB,
            max_blob_size: Self::DEFAULT_MAX_BLOB_SIZE,
        }
    }

    /// Replace the read-time renderer.
    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Replace the payload ceiling.
    pub fn with_max_blob_size(mut self, limit: usize) -> Self {
        self.max_blob_size = limit;
        self
    }

    pub fn max_blob_size(&self) -> usize {
        self.max_blob_size
    }

    pub fn bucket(&self) -> &str {
        self.backend.bucket()
    }

    /// MIME type produced by [`View::Rendered`] fetches.
    pub fn rendered_content_type(&self) -> &'static str {
        self.renderer.content_type()
    }

    /// The key `data` would be stored under, without storing it.
    pub fn key_for(&self, data: &[u8]) -> ContentKey {
        self.hasher.hash(data)
    }

    /// Persist `data` and return its content key.
    ///
    /// Idempotent: identical bytes always return the same key and leave the
    /// stored value as it was.
    pub fn store(&self, data: &[u8]) -> StoreResult<ContentKey> {
        if data.len() > self.max_blob_size {
            return Err(StoreError::TooLarge {
                size: data.len(),
                limit: self.max_blob_size,
            });
        }
        let key = self.hasher.hash(data);
        self.backend.put(&key, data)?;
        tracing::debug!(key = %key.short_hex(), size = data.len(), "stored blob");
        Ok(key)
    }

    /// Read the blob stored under `key`.
    ///
    /// Fails with [`StoreError::NotFound`] if the key is unknown and with
    /// [`StoreError::HashMismatch`] if the backend returns bytes that do not
    /// hash to `key`.
    pub fn fetch(&self, key: &ContentKey, view: View) -> StoreResult<Vec<u8>> {
        let data = self
            .backend
            .get(key)?
            .ok_or(StoreError::NotFound(*key))?;

        let computed = self.hasher.hash(&data);
        if computed != *key {
            tracing::error!(key = %key, computed = %computed, "stored blob is corrupt");
            return Err(StoreError::HashMismatch {
                key: *key,
                computed,
            });
        }

        match view {
            View::Raw => Ok(data),
            View::Rendered => self.renderer.render(&data).map_err(|reason| StoreError::Render {
                key: *key,
                reason,
            }),
        }
    }

    /// Shorthand for `fetch(key, View::Raw)`.
    pub fn fetch_raw(&self, key: &ContentKey) -> StoreResult<Vec<u8>> {
        self.fetch(key, View::Raw)
    }

    /// Shorthand for `fetch(key, View::Rendered)`.
    pub fn fetch_rendered(&self, key: &ContentKey) -> StoreResult<Vec<u8>> {
        self.fetch(key, View::Rendered)
    }

    /// Check whether a blob is stored under `key`.
    pub fn exists(&self, key: &ContentKey) -> StoreResult<bool> {
        self.backend.exists(key)
    }
}

impl std::fmt::Debug for ContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentStore")
            .field("bucket", &self.backend.bucket())
            .field("max_blob_size", &self.max_blob_size)
            .finish()
    }
}
