//! High-level SDK for fab.
//!
//! [`Fab`] wires the content store, document index, session store and user
//! registry together and is the entry point for the HTTP server and the
//! command line. Every failure comes back as an [`SdkError`] whose
//! [`kind`](SdkError::kind) places it in a small, stable taxonomy.

pub mod config;
pub mod error;
pub mod fab;

pub use config::FabConfig;
pub use error::{ErrorKind, SdkError, SdkResult};
pub use fab::{Fab, Profile};

// Re-export key types
pub use fab_index::{Document, Upserted};
pub use fab_store::View;
pub use fab_types::{ContentKey, DocumentId, Requester, SessionToken, Slug, Username, Visibility};
pub use fab_users::User;
