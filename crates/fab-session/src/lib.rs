//! Session store for fab.
//!
//! A session is a random token bound to a username with a fixed expiry,
//! kept in a key-value store. Logging in verifies a credential against the
//! user registry and mints a token; resolving a token never extends it.
//!
//! - [`KvStore`]: set-with-TTL / get / flush key-value interface, with
//!   [`InMemoryKvStore`] and [`SqliteKvStore`] backends
//! - [`SessionStore`]: login, resolve and validate on top of a [`KvStore`]

pub mod error;
pub mod kv;
pub mod memory;
pub mod sqlite;
pub mod store;

pub use error::{SessionError, SessionResult};
pub use kv::{open_kv, KvStore, MEMORY_URL};
pub use memory::InMemoryKvStore;
pub use sqlite::SqliteKvStore;
pub use store::{SessionStore, DEFAULT_SESSION_TTL};
