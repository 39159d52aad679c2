//! Foundation types for fab.
//!
//! This crate provides the identifiers and value types shared by every other
//! fab crate. It has no I/O and no knowledge of storage backends.
//!
//! # Key Types
//!
//! - [`ContentKey`]: Content-addressed blob key (BLAKE3 fingerprint)
//! - [`DocumentId`]: UUID v7 document identifier
//! - [`Username`] / [`Slug`]: Validated names addressing a document
//! - [`Visibility`]: Public or private document flag
//! - [`Requester`]: Identity on whose behalf an operation runs
//! - [`SessionToken`]: Opaque session credential
//! - [`Clock`]: Wall-clock source, swappable in tests via [`ManualClock`]

pub mod clock;
pub mod content;
pub mod document;
pub mod error;
pub mod name;
pub mod requester;
pub mod token;

pub use clock::{Clock, ManualClock, SystemClock};
pub use content::ContentKey;
pub use document::{DocumentId, Visibility};
pub use error::TypeError;
pub use name::{Slug, Username, RESERVED_USERNAMES};
pub use requester::Requester;
pub use token::SessionToken;
