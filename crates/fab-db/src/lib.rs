//! SQLite relational store shared by the user registry and document index.
//!
//! Owns the connection, the schema, and the small helpers both record stores
//! need (unique-violation detection, timestamp conversion). `syncdb` and
//! `clear` from the command line map to [`Database::create_all`] and
//! [`Database::drop_all`].

pub mod database;
pub mod error;
pub mod schema;

pub use database::{from_millis, is_unique_violation, to_millis, Database};
pub use error::{DbError, DbResult};
