use std::fmt;

use fab_index::IndexError;
use fab_session::SessionError;
use fab_store::StoreError;
use fab_users::UserError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    Index(#[from] IndexError),

    #[error("{0}")]
    Session(#[from] SessionError),

    #[error("{0}")]
    Users(#[from] UserError),

    #[error("{0}")]
    Types(#[from] fab_types::TypeError),

    #[error("database error: {0}")]
    Database(#[from] fab_db::DbError),

    #[error("permission denied: {0}")]
    PermissionDenied(String),
}

pub type SdkResult<T> = Result<T, SdkError>;

/// Failure categories callers branch on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Unknown key, owner, document or session.
    NotFound,
    /// Bad credential or unusable session token.
    AuthFailed,
    /// Ownership or visibility violation.
    PermissionDenied,
    /// Malformed or oversized input.
    InvalidInput,
    /// Lost a write race on a unique constraint, or the name is taken.
    Conflict,
    /// Backend or I/O failure, or corrupt stored data.
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::AuthFailed => "auth_failed",
            ErrorKind::PermissionDenied => "permission_denied",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SdkError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SdkError::Store(e) => store_kind(e),
            SdkError::Index(e) => index_kind(e),
            SdkError::Session(e) => match e {
                SessionError::AuthFailed => ErrorKind::AuthFailed,
                SessionError::InvalidSession => ErrorKind::NotFound,
                SessionError::Users(e) => user_kind(e),
                SessionError::Database(_) => ErrorKind::Internal,
            },
            SdkError::Users(e) => user_kind(e),
            SdkError::Types(_) => ErrorKind::InvalidInput,
            SdkError::Database(_) => ErrorKind::Internal,
            SdkError::PermissionDenied(_) => ErrorKind::PermissionDenied,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

fn store_kind(err: &StoreError) -> ErrorKind {
    match err {
        StoreError::NotFound(_) => ErrorKind::NotFound,
        StoreError::TooLarge { .. } | StoreError::Render { .. } => ErrorKind::InvalidInput,
        StoreError::HashMismatch { .. } | StoreError::InvalidBucket(_) | StoreError::Io(_) => {
            ErrorKind::Internal
        }
    }
}

fn index_kind(err: &IndexError) -> ErrorKind {
    match err {
        IndexError::OwnerNotFound { .. }
        | IndexError::DocumentNotFound { .. }
        | IndexError::UnknownDocument(_) => ErrorKind::NotFound,
        IndexError::PermissionDenied { .. } => ErrorKind::PermissionDenied,
        IndexError::Conflict { .. } => ErrorKind::Conflict,
        IndexError::Users(e) => user_kind(e),
        IndexError::Database(_) => ErrorKind::Internal,
    }
}

fn user_kind(err: &UserError) -> ErrorKind {
    match err {
        UserError::NotFound { .. } => ErrorKind::NotFound,
        UserError::UsernameTaken { .. } | UserError::EmailTaken { .. } => ErrorKind::Conflict,
        UserError::InvalidEmail { .. } => ErrorKind::InvalidInput,
        UserError::Password(_) | UserError::Database(_) => ErrorKind::Internal,
    }
}
