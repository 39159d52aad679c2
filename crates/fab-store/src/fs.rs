//! Filesystem blob backend.
//!
//! Layout under the configured root:
//!
//! ```text
//! {root}/{bucket}/objects/ab/cdef0123...   (first two hex chars fan out)
//! {root}/{bucket}/tmp/                     (staging for atomic writes)
//! ```

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use fab_types::ContentKey;
use tempfile::NamedTempFile;

use crate::backend::BlobBackend;
use crate::error::{StoreError, StoreResult};

/// Stores each blob as one file inside a bucket directory.
#[derive(Debug, Clone)]
pub struct FsBlobBackend {
    bucket: String,
    bucket_dir: PathBuf,
}

impl FsBlobBackend {
    /// Create a backend for `bucket` under `root`. Does not touch the disk;
    /// call [`BlobBackend::ensure_bucket`] before the first write.
    pub fn new(root: impl AsRef<Path>, bucket: impl Into<String>) -> StoreResult<Self> {
        let bucket = bucket.into();
        validate_bucket(&bucket)?;
        Ok(Self {
            bucket_dir: root.as_ref().join(&bucket),
            bucket,
        })
    }

    /// Directory holding this bucket.
    pub fn bucket_dir(&self) -> &Path {
        &self.bucket_dir
    }

    fn objects_dir(&self) -> PathBuf {
        self.bucket_dir.join("objects")
    }

    fn tmp_dir(&self) -> PathBuf {
        self.bucket_dir.join("tmp")
    }

    fn object_path(&self, key: &ContentKey) -> PathBuf {
        let hex = key.to_hex();
        let (fan, rest) = hex.split_at(2);
        self.objects_dir().join(fan).join(rest)
    }
}

fn validate_bucket(bucket: &str) -> StoreResult<()> {
    let ok = !bucket.is_empty()
        && bucket.len() <= 63
        && !bucket.starts_with('.')
        && bucket
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.'));
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidBucket(bucket.to_string()))
    }
}

impl BlobBackend for FsBlobBackend {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn ensure_bucket(&self) -> StoreResult<()> {
        std::fs::create_dir_all(self.objects_dir())?;
        std::fs::create_dir_all(self.tmp_dir())?;
        Ok(())
    }

    fn put(&self, key: &ContentKey, data: &[u8]) -> StoreResult<()> {
        let path = self.object_path(key);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        // Stage then rename: a concurrent writer of the same key either sees
        // the old complete file or the new complete file.
        let mut staged = NamedTempFile::new_in(self.tmp_dir())?;
        staged.write_all(data)?;
        staged.as_file().sync_all()?;
        staged.persist(&path).map_err(|e| e.error)?;
        Ok(())
    }

    fn get(&self, key: &ContentKey) -> StoreResult<Option<Vec<u8>>> {
        match std::fs::read(self.object_path(key)) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn exists(&self, key: &ContentKey) -> StoreResult<bool> {
        Ok(self.object_path(key).is_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(n: u8) -> ContentKey {
        ContentKey::from_hash([n; 32])
    }

    fn backend(dir: &tempfile::TempDir) -> FsBlobBackend {
        let backend = FsBlobBackend::new(dir.path(), "docs").unwrap();
        backend.ensure_bucket().unwrap();
        backend
    }

    #[test]
    fn ensure_bucket_creates_layout() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend(&dir);
        assert!(backend.bucket_dir().join("objects").is_dir());
        assert!(backend.bucket_dir().join("tmp").is_dir());
        // Idempotent.
        backend.ensure_bucket().unwrap();
    }

    #[test]
    fn put_and_get() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend(&dir);
        backend.put(&key(0xab), b"body").unwrap();
        assert_eq!(backend.get(&key(0xab)).unwrap().unwrap(), b"body");
        assert!(backend.exists(&key(0xab)).unwrap());
    }

    #[test]
    fn objects_fan_out_by_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend(&dir);
        backend.put(&key(0xab), b"x").unwrap();
        let expected = backend
            .bucket_dir()
            .join("objects")
            .join("ab")
            .join("ab".repeat(31));
        assert!(expected.is_file());
    }

    #[test]
    fn missing_blob_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend(&dir);
        assert!(backend.get(&key(1)).unwrap().is_none());
        assert!(!backend.exists(&key(1)).unwrap());
    }

    #[test]
    fn rewrite_leaves_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend(&dir);
        backend.put(&key(2), b"same").unwrap();
        backend.put(&key(2), b"same").unwrap();
        let fan = backend.bucket_dir().join("objects").join("02");
        assert_eq!(std::fs::read_dir(fan).unwrap().count(), 1);
        let tmp = backend.bucket_dir().join("tmp");
        assert_eq!(std::fs::read_dir(tmp).unwrap().count(), 0);
    }

    #[test]
    fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        backend(&dir).put(&key(3), b"durable").unwrap();
        let reopened = FsBlobBackend::new(dir.path(), "docs").unwrap();
        assert_eq!(reopened.get(&key(3)).unwrap().unwrap(), b"durable");
    }

    #[test]
    fn bucket_names_are_validated() {
        let dir = tempfile::tempdir().unwrap();
        assert!(FsBlobBackend::new(dir.path(), "").is_err());
        assert!(FsBlobBackend::new(dir.path(), "../escape").is_err());
        assert!(FsBlobBackend::new(dir.path(), "Upper").is_err());
        assert!(FsBlobBackend::new(dir.path(), "fab-docs.v1").is_ok());
    }
}
