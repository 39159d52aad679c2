//! The [`KvStore`] trait and backend selection.

use std::sync::Arc;
use std::time::Duration;

use fab_db::Database;
use fab_types::Clock;

use crate::error::SessionResult;
use crate::memory::InMemoryKvStore;
use crate::sqlite::SqliteKvStore;

/// Connection string selecting the in-memory backend.
pub const MEMORY_URL: &str = "memory";

/// A string key-value store with per-entry expiry.
///
/// An entry whose expiry has passed is indistinguishable from an absent
/// one; whether it is physically removed is up to the backend.
pub trait KvStore: Send + Sync {
    /// Store `value` under `key`, replacing any previous value, expiring
    /// `ttl` from now.
    fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> SessionResult<()>;

    /// The live value under `key`.
    fn get(&self, key: &str) -> SessionResult<Option<String>>;

    /// Remove every entry.
    fn flush_all(&self) -> SessionResult<()>;

    /// Physically remove expired entries. Returns how many were removed.
    fn purge_expired(&self) -> SessionResult<usize>;
}

/// Open the backend named by `url`.
///
/// [`MEMORY_URL`] selects [`InMemoryKvStore`]; anything else is handed to
/// [`Database::open`] and backs a [`SqliteKvStore`].
pub fn open_kv(url: &str, clock: Arc<dyn Clock>) -> SessionResult<Arc<dyn KvStore>> {
    if url == MEMORY_URL {
        tracing::debug!("using in-memory session store");
        return Ok(Arc::new(InMemoryKvStore::new(clock)));
    }
    let store = SqliteKvStore::new(Database::open(url)?, clock)?;
    Ok(Arc::new(store))
}

/// Expiry instant for an entry written at `now`.
pub(crate) fn expiry(now: chrono::DateTime<chrono::Utc>, ttl: Duration) -> chrono::DateTime<chrono::Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(chrono::DateTime::<chrono::Utc>::MAX_UTC)
}
