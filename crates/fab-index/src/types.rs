//! Core document record types.

use chrono::{DateTime, Utc};
use fab_types::{ContentKey, DocumentId, Slug, Username, Visibility};
use serde::{Deserialize, Serialize};

/// A document record.
///
/// Identity is `id` (and, equivalently, `(owner, slug)`). Content updates
/// change `content_key`, `revision` and `updated_at` in place; `id`,
/// `created_at` and `forked_from` never change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub owner: Username,
    pub slug: Slug,
    /// Key of the current body in the content store.
    pub content_key: ContentKey,
    pub visibility: Visibility,
    /// The document this one was forked from, if any.
    pub forked_from: Option<DocumentId>,
    /// 1 on creation, incremented by every content update.
    pub revision: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// A fresh, public, unforked record at revision 1.
    pub fn new(owner: Username, slug: Slug, content_key: ContentKey, now: DateTime<Utc>) -> Self {
        Self {
            id: DocumentId::new(),
            owner,
            slug,
            content_key,
            visibility: Visibility::Public,
            forked_from: None,
            revision: 1,
            created_at: now,
            updated_at: now,
        }
    }

    /// `owner/slug`, for messages and logs.
    pub fn path(&self) -> String {
        format!("{}/{}", self.owner, self.slug)
    }
}

/// Result of [`DocumentIndex::upsert`](crate::DocumentIndex::upsert).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Upserted {
    pub document: Document,
    /// `true` if this call created the record, `false` if it updated one.
    pub created: bool,
}
