//! User registry for fab.
//!
//! Maps usernames to credential material. The core only ever looks users up
//! and verifies their passwords; registration and email changes are exposed
//! for the HTTP layer and command line, which act as the collaborator that
//! owns those flows.
//!
//! # Modules
//!
//! - [`error`]: Error types for registry operations
//! - [`types`]: [`User`] and [`NewUser`]
//! - [`traits`]: The [`UserRegistry`] trait
//! - [`memory`]: In-memory [`InMemoryUserRegistry`] for tests
//! - [`sqlite`]: [`SqliteUserRegistry`] over the shared relational store

pub mod error;
pub mod memory;
pub mod sqlite;
pub mod traits;
pub mod types;

pub use error::{UserError, UserResult};
pub use memory::InMemoryUserRegistry;
pub use sqlite::SqliteUserRegistry;
pub use traits::UserRegistry;
pub use types::{validate_email, NewUser, User};
