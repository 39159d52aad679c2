use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use fab_types::Clock;

use crate::error::SessionResult;
use crate::kv::{expiry, KvStore};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Process-local [`KvStore`]. Sessions do not survive a restart.
pub struct InMemoryKvStore {
    entries: DashMap<String, Entry>,
    clock: Arc<dyn Clock>,
}

impl InMemoryKvStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    /// Number of entries held, expired or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KvStore for InMemoryKvStore {
    fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> SessionResult<()> {
        let entry = Entry {
            value: value.to_string(),
            expires_at: expiry(self.clock.now(), ttl),
        };
        self.entries.insert(key.to_string(), entry);
        Ok(())
    }

    fn get(&self, key: &str) -> SessionResult<Option<String>> {
        let now = self.clock.now();
        Ok(self
            .entries
            .get(key)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.value.clone()))
    }

    fn flush_all(&self) -> SessionResult<()> {
        self.entries.clear();
        Ok(())
    }

    fn purge_expired(&self) -> SessionResult<usize> {
        let now = self.clock.now();
        let mut purged = 0;
        self.entries.retain(|_, entry| {
            let live = entry.expires_at > now;
            if !live {
                purged += 1;
            }
            live
        });
        Ok(purged)
    }
}

impl std::fmt::Debug for InMemoryKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryKvStore")
            .field("entries", &self.entries.len())
            .finish()
    }
}
