use std::sync::Arc;
use std::time::Duration;

use fab_db::{to_millis, Database};
use fab_types::Clock;
use rusqlite::{params, OptionalExtension};

use crate::error::SessionResult;
use crate::kv::{expiry, KvStore};

const CREATE_KV: &str = r#"
CREATE TABLE IF NOT EXISTS kv (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    expires_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS kv_expires_at ON kv (expires_at);
"#;

/// [`KvStore`] in a `kv` table, so sessions survive restarts.
///
/// The table is created on construction; it is independent of the
/// relational schema managed by `syncdb` / `clear`.
#[derive(Clone)]
pub struct SqliteKvStore {
    db: Database,
    clock: Arc<dyn Clock>,
}

impl SqliteKvStore {
    pub fn new(db: Database, clock: Arc<dyn Clock>) -> SessionResult<Self> {
        db.with_conn(|conn| {
            conn.execute_batch(CREATE_KV)?;
            Ok(())
        })?;
        Ok(Self { db, clock })
    }
}

impl KvStore for SqliteKvStore {
    fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> SessionResult<()> {
        let expires_at = to_millis(expiry(self.clock.now(), ttl));
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO kv (key, value, expires_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT (key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at",
                params![key, value, expires_at],
            )?;
            Ok(())
        })?;
        Ok(())
    }

    fn get(&self, key: &str) -> SessionResult<Option<String>> {
        let now = to_millis(self.clock.now());
        Ok(self.db.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT value FROM kv WHERE key = ?1 AND expires_at > ?2",
                    params![key, now],
                    |row| row.get(0),
                )
                .optional()?)
        })?)
    }

    fn flush_all(&self) -> SessionResult<()> {
        self.db.with_conn(|conn| {
            conn.execute("DELETE FROM kv", [])?;
            Ok(())
        })?;
        Ok(())
    }

    fn purge_expired(&self) -> SessionResult<usize> {
        let now = to_millis(self.clock.now());
        Ok(self.db.with_conn(|conn| {
            Ok(conn.execute("DELETE FROM kv WHERE expires_at <= ?1", params![now])?)
        })?)
    }
}

impl std::fmt::Debug for SqliteKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteKvStore").field("db", &self.db).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::conformance;
    use fab_types::ManualClock;

    fn kv() -> (SqliteKvStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_now());
        let kv = SqliteKvStore::new(Database::in_memory().unwrap(), clock.clone()).unwrap();
        (kv, clock)
    }

    #[test]
    fn set_then_get() {
        conformance::set_then_get(&kv().0);
    }

    #[test]
    fn entries_expire() {
        let (kv, clock) = kv();
        conformance::entries_expire(&kv, &clock);
    }

    #[test]
    fn flush_all_clears() {
        conformance::flush_all_clears(&kv().0);
    }

    #[test]
    fn coexists_with_relational_schema() {
        let db = Database::in_memory().unwrap();
        db.create_all().unwrap();
        let kv = SqliteKvStore::new(db.clone(), Arc::new(ManualClock::starting_now())).unwrap();
        kv.set_with_ttl("k", "v", Duration::from_secs(60)).unwrap();
        db.drop_all().unwrap();
        assert_eq!(kv.get("k").unwrap().as_deref(), Some("v"));
    }
}
