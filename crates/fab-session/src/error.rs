use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    /// Unknown user or wrong password. Deliberately not told apart.
    #[error("authentication failed")]
    AuthFailed,

    /// The token is unknown or has expired.
    #[error("invalid session")]
    InvalidSession,

    #[error("user registry error: {0}")]
    Users(#[from] fab_users::UserError),

    #[error("key-value store error: {0}")]
    Database(#[from] fab_db::DbError),
}

impl From<rusqlite::Error> for SessionError {
    fn from(err: rusqlite::Error) -> Self {
        SessionError::Database(err.into())
    }
}

pub type SessionResult<T> = std::result::Result<T, SessionError>;
