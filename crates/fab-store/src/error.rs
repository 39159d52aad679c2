use fab_types::ContentKey;

/// Errors from content store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No blob is stored under the requested key.
    #[error("content not found: {0}")]
    NotFound(ContentKey),

    /// The payload exceeds the configured size ceiling.
    #[error("payload of {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },

    /// Content hash mismatch on read (data corruption).
    #[error("hash mismatch for {key}: stored bytes hash to {computed}")]
    HashMismatch {
        key: ContentKey,
        computed: ContentKey,
    },

    /// The blob could not be rendered (for example, it is not UTF-8 text).
    #[error("cannot render {key}: {reason}")]
    Render { key: ContentKey, reason: String },

    /// The bucket name is not usable as a storage location.
    #[error("invalid bucket name {0:?}")]
    InvalidBucket(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
