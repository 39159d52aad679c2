use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid key length: expected {expected} hex characters, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("invalid username {name:?}: {reason}")]
    InvalidUsername { name: String, reason: String },

    #[error("invalid slug {slug:?}: {reason}")]
    InvalidSlug { slug: String, reason: String },

    #[error("invalid document id: {0}")]
    InvalidDocumentId(String),

    #[error("unknown visibility: {0}")]
    UnknownVisibility(String),
}
