use std::path::PathBuf;
use std::time::Duration;

use fab_session::{DEFAULT_SESSION_TTL, MEMORY_URL};
use fab_store::ContentStore;

/// Where a [`Fab`](crate::Fab) keeps its state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FabConfig {
    /// Blob bucket name.
    pub bucket: String,
    /// Directory holding buckets. `None` keeps blobs in memory.
    pub blob_root: Option<PathBuf>,
    /// Relational store connection string (`:memory:` or a SQLite path).
    pub database_url: String,
    /// Session store connection string (`memory` or a SQLite path).
    pub session_url: String,
    pub max_blob_size: usize,
    pub session_ttl: Duration,
}

impl FabConfig {
    /// Everything in memory. Nothing survives the process.
    pub fn in_memory() -> Self {
        Self {
            bucket: "memory".to_string(),
            blob_root: None,
            database_url: ":memory:".to_string(),
            session_url: MEMORY_URL.to_string(),
            max_blob_size: ContentStore::DEFAULT_MAX_BLOB_SIZE,
            session_ttl: DEFAULT_SESSION_TTL,
        }
    }
}
