//! Error types for registry operations.

use fab_types::Username;
use thiserror::Error;

/// Errors that can occur during registry operations.
#[derive(Debug, Error)]
pub enum UserError {
    /// No user with this username exists.
    #[error("user not found: {username}")]
    NotFound { username: Username },

    /// The username is already registered.
    #[error("username already taken: {username}")]
    UsernameTaken { username: Username },

    /// The email is already registered to another user.
    #[error("email already registered: {email}")]
    EmailTaken { email: String },

    /// The email address is malformed.
    #[error("invalid email {email:?}: {reason}")]
    InvalidEmail { email: String, reason: String },

    /// Password hashing failed.
    #[error("password error: {0}")]
    Password(#[from] fab_crypto::PasswordError),

    /// Failure in the relational store.
    #[error("database error: {0}")]
    Database(#[from] fab_db::DbError),
}

impl UserError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, UserError::NotFound { .. })
    }
}

impl From<rusqlite::Error> for UserError {
    fn from(err: rusqlite::Error) -> Self {
        UserError::Database(err.into())
    }
}

/// Convenience type alias for registry operations.
pub type UserResult<T> = std::result::Result<T, UserError>;
