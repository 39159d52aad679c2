//! Document index for fab.
//!
//! A document is a named `(owner, slug)` binding to the content key of its
//! current body. The index owns that binding and nothing else: bytes live in
//! the content store, credentials in the user registry.
//!
//! # Architecture
//!
//! - [`DocumentStore`] is the record-level collaborator (relational table
//!   with a unique `(owner, slug)` constraint). It performs no authorization.
//! - [`DocumentIndex`] sits on top and is the enforcement point: every call
//!   takes a [`Requester`](fab_types::Requester) and checks ownership or
//!   visibility before touching records. It also serializes writes per
//!   `(owner, slug)` and retries once when an insert loses a race.
//!
//! # Modules
//!
//! - [`error`]: Error types for index operations
//! - [`types`]: [`Document`] and [`Upserted`]
//! - [`traits`]: The [`DocumentStore`] trait
//! - [`memory`]: In-memory [`InMemoryDocumentStore`] for tests
//! - [`sqlite`]: [`SqliteDocumentStore`] over the shared relational store
//! - [`index`]: The authorizing [`DocumentIndex`]

pub mod error;
pub mod index;
mod locks;
pub mod memory;
pub mod sqlite;
pub mod traits;
pub mod types;

pub use error::{IndexError, IndexResult};
pub use index::DocumentIndex;
pub use memory::InMemoryDocumentStore;
pub use sqlite::SqliteDocumentStore;
pub use traits::DocumentStore;
pub use types::{Document, Upserted};
