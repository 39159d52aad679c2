//! Error types for index operations.

use fab_types::{DocumentId, Slug, Username};
use thiserror::Error;

/// Errors that can occur during index operations.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The owner is not a registered user.
    #[error("owner not found: {owner}")]
    OwnerNotFound { owner: Username },

    /// The owner exists but has no document at this slug.
    #[error("document not found: {owner}/{slug}")]
    DocumentNotFound { owner: Username, slug: Slug },

    /// No document has this id.
    #[error("document not found: {0}")]
    UnknownDocument(DocumentId),

    /// The requester may not perform this action on this document.
    #[error("{requester} may not {action} {target}")]
    PermissionDenied {
        requester: String,
        action: &'static str,
        target: String,
    },

    /// A record already exists at `(owner, slug)`.
    #[error("conflicting write to {owner}/{slug}")]
    Conflict { owner: Username, slug: Slug },

    /// Failure in the user registry.
    #[error("user registry error: {0}")]
    Users(#[from] fab_users::UserError),

    /// Failure in the relational store.
    #[error("database error: {0}")]
    Database(#[from] fab_db::DbError),
}

impl IndexError {
    /// Owner, slug, or id did not resolve.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            IndexError::OwnerNotFound { .. }
                | IndexError::DocumentNotFound { .. }
                | IndexError::UnknownDocument(_)
        )
    }
}

impl From<rusqlite::Error> for IndexError {
    fn from(err: rusqlite::Error) -> Self {
        IndexError::Database(err.into())
    }
}

/// Convenience type alias for index operations.
pub type IndexResult<T> = std::result::Result<T, IndexError>;
