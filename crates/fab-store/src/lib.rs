//! Content-addressed blob storage for fab.
//!
//! Every document body and every piece of anonymously posted content is
//! stored as an immutable blob under its BLAKE3 fingerprint. Because the key
//! is derived from the bytes, storing the same bytes twice yields the same
//! key and leaves the stored value unchanged; there is nothing to coordinate.
//!
//! # Storage Backends
//!
//! All backends implement the [`BlobBackend`] trait (create-bucket, put,
//! get):
//!
//! - [`InMemoryBlobBackend`] -- `HashMap`-based backend for tests and embedding
//! - [`FsBlobBackend`] -- one file per blob under a bucket directory
//!
//! # Design Rules
//!
//! 1. Blobs are immutable once written (content-addressing guarantees this).
//! 2. No existence check before a write; rewriting identical bytes is a no-op.
//! 3. Bytes are re-hashed on read; a mismatch is corruption, never returned.
//! 4. Rendering is applied on every read and never written back.
//! 5. Oversized payloads are rejected, never truncated.

pub mod backend;
pub mod error;
pub mod fs;
pub mod render;
pub mod store;

pub use backend::{BlobBackend, InMemoryBlobBackend};
pub use error::{StoreError, StoreResult};
pub use fs::FsBlobBackend;
pub use render::{MarkdownRenderer, Renderer};
pub use store::{ContentStore, View};
