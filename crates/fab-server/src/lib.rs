//! HTTP server for fab.
//!
//! Exposes profiles, documents, anonymous content and sessions over a small
//! REST surface. Handlers authenticate the bearer token, then hand the
//! requester to the core, which decides what it may see and change.

pub mod auth;
pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;
pub mod state;

pub use auth::{AuthProvider, Authenticated, Credentials, SessionAuth};
pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::FabServer;
pub use state::AppState;
