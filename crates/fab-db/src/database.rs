use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, ErrorCode};

use crate::error::{DbError, DbResult};
use crate::schema;

/// Shared handle to the SQLite database.
///
/// rusqlite is synchronous, so the connection sits behind a mutex and callers
/// on an async runtime are expected to use `spawn_blocking`. Cloning the
/// handle shares the same connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    url: String,
}

impl Database {
    /// Open a database from a connection string.
    ///
    /// `:memory:` opens a private in-memory database; anything else is a file
    /// path, optionally prefixed with `sqlite://`. Parent directories are
    /// created as needed.
    pub fn open(url: &str) -> DbResult<Self> {
        let path = url.strip_prefix("sqlite://").unwrap_or(url);
        if path.is_empty() {
            return Err(DbError::InvalidUrl(url.to_string()));
        }
        if path == ":memory:" {
            return Self::in_memory();
        }

        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::configure(conn, url)
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> DbResult<Self> {
        Self::configure(Connection::open_in_memory()?, ":memory:")
    }

    fn configure(conn: Connection, url: &str) -> DbResult<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        tracing::info!(url, "database opened");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            url: url.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Run `f` with exclusive access to the connection.
    pub fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> DbResult<T>) -> DbResult<T> {
        let mut conn = self.conn.lock();
        f(&mut conn)
    }

    /// Create every table that does not exist yet.
    pub fn create_all(&self) -> DbResult<()> {
        self.with_conn(|conn| {
            conn.execute_batch(schema::CREATE_ALL)?;
            Ok(())
        })?;
        tracing::info!(url = %self.url, "schema created");
        Ok(())
    }

    /// Drop every table. All users and documents are lost.
    pub fn drop_all(&self) -> DbResult<()> {
        self.with_conn(|conn| {
            conn.execute_batch(schema::DROP_ALL)?;
            Ok(())
        })?;
        tracing::warn!(url = %self.url, "schema dropped");
        Ok(())
    }

    /// Names of the tables currently present, sorted.
    pub fn tables(&self) -> DbResult<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
            )?;
            let names = stmt
                .query_map([], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            Ok(names)
        })
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").field("url", &self.url).finish()
    }
}

/// Returns `true` if `err` is a UNIQUE or PRIMARY KEY constraint violation.
pub fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.code == ErrorCode::ConstraintViolation
                && matches!(
                    e.extended_code,
                    rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                        | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                )
        }
        _ => false,
    }
}

/// Timestamp column encoding: milliseconds since the UNIX epoch.
pub fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

/// Inverse of [`to_millis`]. Out-of-range values clamp to the epoch.
pub fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}
