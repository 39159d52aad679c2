//! In-memory implementation of [`DocumentStore`] for testing and development.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use fab_types::{ContentKey, DocumentId, Slug, Username, Visibility};
use parking_lot::RwLock;

use crate::error::{IndexError, IndexResult};
use crate::traits::DocumentStore;
use crate::types::Document;

/// An in-memory document store.
///
/// Every owner is accepted; it does not consult a user registry.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    docs: HashMap<DocumentId, Document>,
    by_path: HashMap<(Username, Slug), DocumentId>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn modify(
        &self,
        id: &DocumentId,
        f: impl FnOnce(&mut Document),
    ) -> IndexResult<Option<Document>> {
        let mut inner = self.inner.write();
        Ok(inner.docs.get_mut(id).map(|doc| {
            f(doc);
            doc.clone()
        }))
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn get(&self, owner: &Username, slug: &Slug) -> IndexResult<Option<Document>> {
        let inner = self.inner.read();
        Ok(inner
            .by_path
            .get(&(owner.clone(), slug.clone()))
            .and_then(|id| inner.docs.get(id))
            .cloned())
    }

    fn get_by_id(&self, id: &DocumentId) -> IndexResult<Option<Document>> {
        Ok(self.inner.read().docs.get(id).cloned())
    }

    fn insert(&self, document: &Document) -> IndexResult<()> {
        let mut inner = self.inner.write();
        let path = (document.owner.clone(), document.slug.clone());
        if inner.by_path.contains_key(&path) || inner.docs.contains_key(&document.id) {
            return Err(IndexError::Conflict {
                owner: document.owner.clone(),
                slug: document.slug.clone(),
            });
        }
        inner.by_path.insert(path, document.id);
        inner.docs.insert(document.id, document.clone());
        Ok(())
    }

    fn update_content(
        &self,
        id: &DocumentId,
        key: &ContentKey,
        at: DateTime<Utc>,
    ) -> IndexResult<Option<Document>> {
        self.modify(id, |doc| {
            doc.content_key = *key;
            doc.revision += 1;
            doc.updated_at = at;
        })
    }

    fn set_visibility(
        &self,
        id: &DocumentId,
        visibility: Visibility,
        at: DateTime<Utc>,
    ) -> IndexResult<Option<Document>> {
        self.modify(id, |doc| {
            doc.visibility = visibility;
            doc.updated_at = at;
        })
    }

    fn list_by_owner(&self, owner: &Username) -> IndexResult<Vec<Document>> {
        let inner = self.inner.read();
        let mut docs: Vec<Document> = inner
            .docs
            .values()
            .filter(|d| &d.owner == owner)
            .cloned()
            .collect();
        docs.sort_by(|a, b| a.slug.cmp(&b.slug));
        Ok(docs)
    }

    fn count(&self) -> IndexResult<usize> {
        Ok(self.inner.read().docs.len())
    }
}
