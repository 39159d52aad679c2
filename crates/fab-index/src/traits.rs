//! The [`DocumentStore`] trait defining the document record interface.

use chrono::{DateTime, Utc};
use fab_types::{ContentKey, DocumentId, Slug, Username, Visibility};

use crate::error::IndexResult;
use crate::types::Document;

/// Storage backend for document records.
///
/// Implementations must be thread-safe (`Send + Sync`) and enforce that at
/// most one record exists per `(owner, slug)`. No authorization happens at
/// this layer; see [`DocumentIndex`](crate::DocumentIndex).
pub trait DocumentStore: Send + Sync {
    /// Read the record at `(owner, slug)`.
    ///
    /// Returns `Ok(None)` if there is none.
    fn get(&self, owner: &Username, slug: &Slug) -> IndexResult<Option<Document>>;

    /// Read a record by id.
    fn get_by_id(&self, id: &DocumentId) -> IndexResult<Option<Document>>;

    /// Insert a new record.
    ///
    /// Fails with [`IndexError::Conflict`](crate::IndexError::Conflict) if a
    /// record already exists at the same `(owner, slug)`, and with
    /// [`IndexError::OwnerNotFound`](crate::IndexError::OwnerNotFound) if the
    /// backend tracks users and does not know the owner.
    fn insert(&self, document: &Document) -> IndexResult<()>;

    /// Rebind a record to `key`, bump its revision and set `updated_at`.
    ///
    /// Returns the updated record, or `Ok(None)` if `id` is unknown.
    fn update_content(
        &self,
        id: &DocumentId,
        key: &ContentKey,
        at: DateTime<Utc>,
    ) -> IndexResult<Option<Document>>;

    /// Change a record's visibility. The revision is left alone.
    fn set_visibility(
        &self,
        id: &DocumentId,
        visibility: Visibility,
        at: DateTime<Utc>,
    ) -> IndexResult<Option<Document>>;

    /// Every record owned by `owner`, sorted by slug.
    fn list_by_owner(&self, owner: &Username) -> IndexResult<Vec<Document>>;

    /// Total number of records.
    fn count(&self) -> IndexResult<usize>;
}
