//! The authorizing document index.

use std::sync::Arc;

use fab_types::{Clock, ContentKey, DocumentId, Requester, Slug, SystemClock, Username, Visibility};
use fab_users::UserRegistry;

use crate::error::{IndexError, IndexResult};
use crate::locks::PathLocks;
use crate::traits::DocumentStore;
use crate::types::{Document, Upserted};

/// Maps `(owner, slug)` to the content key of the document's current body.
///
/// Every operation takes the [`Requester`] it runs for. Public documents are
/// readable by anyone; private ones only by their owner. Only the owner may
/// write, change visibility, or be the target of a fork into their
/// namespace.
///
/// Writes to the same `(owner, slug)` are serialized through a lock stripe,
/// so within one process the last upsert to take the lock wins. The
/// backing store's unique constraint catches anything that slips past it
/// (another process on the same database); [`upsert`](Self::upsert) retries
/// once on that conflict before surfacing it.
pub struct DocumentIndex {
    store: Arc<dyn DocumentStore>,
    users: Arc<dyn UserRegistry>,
    clock: Arc<dyn Clock>,
    locks: PathLocks,
}

impl DocumentIndex {
    pub fn new(store: Arc<dyn DocumentStore>, users: Arc<dyn UserRegistry>) -> Self {
        Self {
            store,
            users,
            clock: Arc::new(SystemClock),
            locks: PathLocks::new(),
        }
    }

    /// Replace the clock used for `created_at` / `updated_at`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// The content key bound to `(owner, slug)`.
    pub fn resolve(
        &self,
        requester: &Requester,
        owner: &Username,
        slug: &Slug,
    ) -> IndexResult<ContentKey> {
        self.document(requester, owner, slug).map(|doc| doc.content_key)
    }

    /// The full record at `(owner, slug)`, under the same rules as
    /// [`resolve`](Self::resolve).
    pub fn document(
        &self,
        requester: &Requester,
        owner: &Username,
        slug: &Slug,
    ) -> IndexResult<Document> {
        match self.store.get(owner, slug)? {
            Some(doc) => {
                check_read(requester, &doc)?;
                Ok(doc)
            }
            None => Err(self.missing(owner, slug)?),
        }
    }

    /// The record with this id, if the requester may read it.
    pub fn document_by_id(&self, requester: &Requester, id: &DocumentId) -> IndexResult<Document> {
        let doc = self
            .store
            .get_by_id(id)?
            .ok_or(IndexError::UnknownDocument(*id))?;
        check_read(requester, &doc)?;
        Ok(doc)
    }

    /// Bind `(owner, slug)` to `key`, creating the record if needed.
    ///
    /// An existing record is updated in place: same id, same fork lineage,
    /// revision incremented. Only `owner` may do this.
    pub fn upsert(
        &self,
        requester: &Requester,
        owner: &Username,
        slug: &Slug,
        key: &ContentKey,
    ) -> IndexResult<Upserted> {
        if !requester.is(owner) {
            return Err(denied(requester, "write", format!("{owner}/{slug}")));
        }

        let _guard = self.locks.lock(owner, slug);
        let mut checked_owner = false;
        for attempt in 0..2 {
            let now = self.clock.now();
            if let Some(existing) = self.store.get(owner, slug)? {
                if let Some(document) = self.store.update_content(&existing.id, key, now)? {
                    tracing::debug!(
                        path = %document.path(),
                        revision = document.revision,
                        key = %key.short_hex(),
                        "document updated"
                    );
                    return Ok(Upserted {
                        document,
                        created: false,
                    });
                }
                // Removed between read and update; fall through to create.
            }

            if !checked_owner {
                if !self.users.exists(owner)? {
                    return Err(IndexError::OwnerNotFound {
                        owner: owner.clone(),
                    });
                }
                checked_owner = true;
            }

            let document = Document::new(owner.clone(), slug.clone(), *key, now);
            match self.store.insert(&document) {
                Ok(()) => {
                    tracing::info!(path = %document.path(), id = %document.id, "document created");
                    return Ok(Upserted {
                        document,
                        created: true,
                    });
                }
                Err(IndexError::Conflict { .. }) if attempt == 0 => {
                    tracing::warn!(%owner, %slug, "insert lost a race, retrying as update");
                }
                Err(e) => return Err(e),
            }
        }

        Err(IndexError::Conflict {
            owner: owner.clone(),
            slug: slug.clone(),
        })
    }

    /// Copy `source`'s binding into a new document owned by the requester.
    ///
    /// The fork starts at the source's content key and visibility, records
    /// the source as its parent, and is independent afterwards. It lands at
    /// `slug`, or at the source's slug if none is given. A taken target is
    /// [`IndexError::Conflict`].
    pub fn fork(
        &self,
        requester: &Requester,
        source: &DocumentId,
        slug: Option<Slug>,
    ) -> IndexResult<Document> {
        let owner = requester
            .username()
            .ok_or_else(|| denied(requester, "fork", source.to_string()))?;
        let source = self.document_by_id(requester, source)?;
        if !self.users.exists(owner)? {
            return Err(IndexError::OwnerNotFound {
                owner: owner.clone(),
            });
        }

        let slug = slug.unwrap_or_else(|| source.slug.clone());
        let _guard = self.locks.lock(owner, &slug);
        let fork = Document {
            visibility: source.visibility,
            forked_from: Some(source.id),
            ..Document::new(owner.clone(), slug, source.content_key, self.clock.now())
        };
        self.store.insert(&fork)?;
        tracing::info!(source = %source.path(), fork = %fork.path(), "document forked");
        Ok(fork)
    }

    /// Make a document public or private. Owner only.
    pub fn set_visibility(
        &self,
        requester: &Requester,
        owner: &Username,
        slug: &Slug,
        visibility: Visibility,
    ) -> IndexResult<Document> {
        if !requester.is(owner) {
            return Err(denied(requester, "change visibility of", format!("{owner}/{slug}")));
        }
        let _guard = self.locks.lock(owner, slug);
        let existing = match self.store.get(owner, slug)? {
            Some(doc) => doc,
            None => return Err(self.missing(owner, slug)?),
        };
        self.store
            .set_visibility(&existing.id, visibility, self.clock.now())?
            .ok_or_else(|| IndexError::DocumentNotFound {
                owner: owner.clone(),
                slug: slug.clone(),
            })
    }

    /// `owner`'s documents that the requester may read, sorted by slug.
    pub fn list(&self, requester: &Requester, owner: &Username) -> IndexResult<Vec<Document>> {
        if !self.users.exists(owner)? {
            return Err(IndexError::OwnerNotFound {
                owner: owner.clone(),
            });
        }
        Ok(self
            .store
            .list_by_owner(owner)?
            .into_iter()
            .filter(|doc| can_read(requester, doc))
            .collect())
    }

    /// Tell a missing owner apart from a missing document.
    fn missing(&self, owner: &Username, slug: &Slug) -> IndexResult<IndexError> {
        if self.users.exists(owner)? {
            Ok(IndexError::DocumentNotFound {
                owner: owner.clone(),
                slug: slug.clone(),
            })
        } else {
            Ok(IndexError::OwnerNotFound {
                owner: owner.clone(),
            })
        }
    }
}

impl std::fmt::Debug for DocumentIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentIndex").finish_non_exhaustive()
    }
}

fn can_read(requester: &Requester, doc: &Document) -> bool {
    doc.visibility.is_public() || requester.is(&doc.owner)
}

fn check_read(requester: &Requester, doc: &Document) -> IndexResult<()> {
    if can_read(requester, doc) {
        Ok(())
    } else {
        Err(denied(requester, "read", doc.path()))
    }
}

fn denied(requester: &Requester, action: &'static str, target: String) -> IndexError {
    IndexError::PermissionDenied {
        requester: requester.to_string(),
        action,
        target,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryDocumentStore;
    use crate::sqlite::SqliteDocumentStore;
    use fab_db::Database;
    use fab_types::ManualClock;
    use fab_users::{InMemoryUserRegistry, NewUser, SqliteUserRegistry};
    use std::collections::HashSet;
    use std::time::Duration;

    fn user(name: &str) -> Username {
        Username::new(name).unwrap()
    }

    fn slug(s: &str) -> Slug {
        Slug::new(s).unwrap()
    }

    fn key(byte: u8) -> ContentKey {
        ContentKey::from_hash([byte; 32])
    }

    fn as_user(name: &str) -> Requester {
        Requester::user(user(name))
    }

    fn register(users: &dyn UserRegistry, name: &str) {
        users
            .register(NewUser::new(user(name), &format!("{name}@example.com"), "pw").unwrap())
            .unwrap();
    }

    /// Index over in-memory backends with `alice` and `bob` registered.
    fn index() -> DocumentIndex {
        let users = Arc::new(InMemoryUserRegistry::new());
        register(users.as_ref(), "alice");
        register(users.as_ref(), "bob");
        DocumentIndex::new(Arc::new(InMemoryDocumentStore::new()), users)
    }

    /// Index over a shared SQLite database with `alice` and `bob` registered.
    fn sqlite_index() -> DocumentIndex {
        let db = Database::in_memory().unwrap();
        db.create_all().unwrap();
        let users = Arc::new(SqliteUserRegistry::new(db.clone()));
        register(users.as_ref(), "alice");
        register(users.as_ref(), "bob");
        DocumentIndex::new(Arc::new(SqliteDocumentStore::new(db)), users)
    }

    // -----------------------------------------------------------------------
    // Upsert and resolve
    // -----------------------------------------------------------------------

    #[test]
    fn update_in_place() {
        for index in [index(), sqlite_index()] {
            let alice = as_user("alice");
            let first = index.upsert(&alice, &user("alice"), &slug("notes"), &key(1)).unwrap();
            assert!(first.created);
            assert_eq!(first.document.revision, 1);

            let second = index.upsert(&alice, &user("alice"), &slug("notes"), &key(2)).unwrap();
            assert!(!second.created);
            assert_eq!(second.document.id, first.document.id);
            assert_eq!(second.document.revision, 2);

            assert_eq!(
                index.resolve(&Requester::Anonymous, &user("alice"), &slug("notes")).unwrap(),
                key(2)
            );
            assert_eq!(index.store().count().unwrap(), 1);
        }
    }

    #[test]
    fn timestamps_follow_the_clock() {
        let clock = Arc::new(ManualClock::starting_now());
        let index = index().with_clock(clock.clone());
        let alice = as_user("alice");

        let created = index.upsert(&alice, &user("alice"), &slug("notes"), &key(1)).unwrap();
        clock.advance(Duration::from_secs(60));
        let updated = index.upsert(&alice, &user("alice"), &slug("notes"), &key(2)).unwrap();

        assert_eq!(updated.document.created_at, created.document.created_at);
        assert_eq!(
            updated.document.updated_at - created.document.updated_at,
            chrono::Duration::seconds(60)
        );
    }

    #[test]
    fn only_owner_may_upsert() {
        let index = index();
        for requester in [Requester::Anonymous, as_user("bob")] {
            let err = index
                .upsert(&requester, &user("alice"), &slug("notes"), &key(1))
                .unwrap_err();
            assert!(matches!(err, IndexError::PermissionDenied { .. }), "got {err:?}");
        }
        assert_eq!(index.store().count().unwrap(), 0);
    }

    #[test]
    fn upsert_for_unknown_owner_is_not_found() {
        let index = index();
        let err = index
            .upsert(&as_user("carol"), &user("carol"), &slug("notes"), &key(1))
            .unwrap_err();
        assert!(matches!(err, IndexError::OwnerNotFound { .. }), "got {err:?}");
    }

    #[test]
    fn missing_owner_and_missing_document_are_distinguished() {
        let index = index();
        let anon = Requester::Anonymous;
        assert!(matches!(
            index.resolve(&anon, &user("carol"), &slug("notes")),
            Err(IndexError::OwnerNotFound { .. })
        ));
        let err = index.resolve(&anon, &user("alice"), &slug("notes")).unwrap_err();
        assert!(matches!(err, IndexError::DocumentNotFound { .. }));
        assert!(err.is_not_found());
    }

    #[test]
    fn conflicting_insert_is_retried_as_update() {
        // The lock stripe makes this unreachable in-process, so race the
        // index against a direct insert through the shared store.
        struct RacingStore {
            inner: InMemoryDocumentStore,
            raced: parking_lot::Mutex<bool>,
        }
        impl DocumentStore for RacingStore {
            fn get(&self, owner: &Username, slug: &Slug) -> IndexResult<Option<Document>> {
                let found = self.inner.get(owner, slug)?;
                let mut raced = self.raced.lock();
                if found.is_none() && !*raced {
                    *raced = true;
                    let rival = Document::new(owner.clone(), slug.clone(), key(9), chrono::Utc::now());
                    self.inner.insert(&rival)?;
                }
                Ok(found)
            }
            fn get_by_id(&self, id: &DocumentId) -> IndexResult<Option<Document>> {
                self.inner.get_by_id(id)
            }
            fn insert(&self, document: &Document) -> IndexResult<()> {
                self.inner.insert(document)
            }
            fn update_content(
                &self,
                id: &DocumentId,
                key: &ContentKey,
                at: chrono::DateTime<chrono::Utc>,
            ) -> IndexResult<Option<Document>> {
                self.inner.update_content(id, key, at)
            }
            fn set_visibility(
                &self,
                id: &DocumentId,
                visibility: Visibility,
                at: chrono::DateTime<chrono::Utc>,
            ) -> IndexResult<Option<Document>> {
                self.inner.set_visibility(id, visibility, at)
            }
            fn list_by_owner(&self, owner: &Username) -> IndexResult<Vec<Document>> {
                self.inner.list_by_owner(owner)
            }
            fn count(&self) -> IndexResult<usize> {
                self.inner.count()
            }
        }

        let users = Arc::new(InMemoryUserRegistry::new());
        register(users.as_ref(), "alice");
        let store = Arc::new(RacingStore {
            inner: InMemoryDocumentStore::new(),
            raced: parking_lot::Mutex::new(false),
        });
        let index = DocumentIndex::new(store.clone(), users);

        let result = index
            .upsert(&as_user("alice"), &user("alice"), &slug("notes"), &key(1))
            .unwrap();
        assert!(!result.created);
        assert_eq!(result.document.revision, 2);
        assert_eq!(result.document.content_key, key(1));
        assert_eq!(store.count().unwrap(), 1);
    }

    // -----------------------------------------------------------------------
    // Concurrency
    // -----------------------------------------------------------------------

    #[test]
    fn concurrent_upserts_never_duplicate() {
        use std::thread;

        for index in [index(), sqlite_index()] {
            let index = Arc::new(index);
            let handles: Vec<_> = (0..50u8)
                .map(|i| {
                    let index = Arc::clone(&index);
                    thread::spawn(move || {
                        index
                            .upsert(&as_user("alice"), &user("alice"), &slug("notes"), &key(i))
                            .unwrap()
                    })
                })
                .collect();
            let results: Vec<Upserted> = handles
                .into_iter()
                .map(|h| h.join().expect("thread should not panic"))
                .collect();

            assert_eq!(index.store().count().unwrap(), 1);
            assert_eq!(results.iter().filter(|r| r.created).count(), 1);

            let revisions: HashSet<u64> = results.iter().map(|r| r.document.revision).collect();
            assert_eq!(revisions, (1..=50).collect());

            let last = results
                .iter()
                .max_by_key(|r| r.document.revision)
                .unwrap();
            assert_eq!(
                index.resolve(&Requester::Anonymous, &user("alice"), &slug("notes")).unwrap(),
                last.document.content_key
            );
        }
    }

    // -----------------------------------------------------------------------
    // Forks
    // -----------------------------------------------------------------------

    #[test]
    fn fork_independence() {
        for index in [index(), sqlite_index()] {
            let (alice, bob) = (as_user("alice"), as_user("bob"));
            let source = index
                .upsert(&alice, &user("alice"), &slug("notes"), &key(1))
                .unwrap()
                .document;

            let fork = index.fork(&bob, &source.id, None).unwrap();
            assert_eq!(fork.owner, user("bob"));
            assert_eq!(fork.slug, slug("notes"));
            assert_eq!(fork.content_key, key(1));
            assert_eq!(fork.forked_from, Some(source.id));
            assert_ne!(fork.id, source.id);

            index.upsert(&alice, &user("alice"), &slug("notes"), &key(2)).unwrap();
            assert_eq!(index.resolve(&bob, &user("bob"), &slug("notes")).unwrap(), key(1));

            index.upsert(&bob, &user("bob"), &slug("notes"), &key(3)).unwrap();
            assert_eq!(index.resolve(&alice, &user("alice"), &slug("notes")).unwrap(), key(2));

            let fork_now = index.document(&bob, &user("bob"), &slug("notes")).unwrap();
            assert_eq!(fork_now.forked_from, Some(source.id));
        }
    }

    #[test]
    fn fork_to_new_slug_and_into_taken_slug() {
        let index = index();
        let alice = as_user("alice");
        let source = index
            .upsert(&alice, &user("alice"), &slug("notes"), &key(1))
            .unwrap()
            .document;

        let copy = index.fork(&alice, &source.id, Some(slug("notes-v2"))).unwrap();
        assert_eq!(copy.owner, user("alice"));
        assert_eq!(copy.slug, slug("notes-v2"));

        let err = index.fork(&alice, &source.id, None).unwrap_err();
        assert!(matches!(err, IndexError::Conflict { .. }), "got {err:?}");
    }

    #[test]
    fn fork_requires_identity_and_read_access() {
        let index = index();
        let alice = as_user("alice");
        let source = index
            .upsert(&alice, &user("alice"), &slug("diary"), &key(1))
            .unwrap()
            .document;

        assert!(matches!(
            index.fork(&Requester::Anonymous, &source.id, None),
            Err(IndexError::PermissionDenied { .. })
        ));

        index
            .set_visibility(&alice, &user("alice"), &slug("diary"), Visibility::Private)
            .unwrap();
        assert!(matches!(
            index.fork(&as_user("bob"), &source.id, None),
            Err(IndexError::PermissionDenied { .. })
        ));

        assert!(matches!(
            index.fork(&alice, &DocumentId::new(), None),
            Err(IndexError::UnknownDocument(_))
        ));
    }

    // -----------------------------------------------------------------------
    // Visibility and listing
    // -----------------------------------------------------------------------

    #[test]
    fn private_document_denied_to_others() {
        for index in [index(), sqlite_index()] {
            let alice = as_user("alice");
            index.upsert(&alice, &user("alice"), &slug("diary"), &key(1)).unwrap();
            let doc = index
                .set_visibility(&alice, &user("alice"), &slug("diary"), Visibility::Private)
                .unwrap();
            assert_eq!(doc.visibility, Visibility::Private);
            assert_eq!(doc.revision, 1);

            assert_eq!(index.resolve(&alice, &user("alice"), &slug("diary")).unwrap(), key(1));
            for other in [Requester::Anonymous, as_user("bob")] {
                let err = index.resolve(&other, &user("alice"), &slug("diary")).unwrap_err();
                assert!(matches!(err, IndexError::PermissionDenied { .. }), "got {err:?}");
            }
        }
    }

    #[test]
    fn only_owner_may_change_visibility() {
        let index = index();
        index
            .upsert(&as_user("alice"), &user("alice"), &slug("notes"), &key(1))
            .unwrap();
        assert!(matches!(
            index.set_visibility(&as_user("bob"), &user("alice"), &slug("notes"), Visibility::Private),
            Err(IndexError::PermissionDenied { .. })
        ));
        assert!(matches!(
            index.set_visibility(&as_user("alice"), &user("alice"), &slug("missing"), Visibility::Private),
            Err(IndexError::DocumentNotFound { .. })
        ));
    }

    #[test]
    fn list_hides_private_documents_from_others() {
        let index = index();
        let alice = as_user("alice");
        for s in ["zeta", "alpha", "diary"] {
            index.upsert(&alice, &user("alice"), &slug(s), &key(1)).unwrap();
        }
        index
            .set_visibility(&alice, &user("alice"), &slug("diary"), Visibility::Private)
            .unwrap();

        let slugs = |requester: &Requester| -> Vec<String> {
            index
                .list(requester, &user("alice"))
                .unwrap()
                .into_iter()
                .map(|d| d.slug.to_string())
                .collect()
        };
        assert_eq!(slugs(&alice), vec!["alpha", "diary", "zeta"]);
        assert_eq!(slugs(&as_user("bob")), vec!["alpha", "zeta"]);
        assert_eq!(slugs(&Requester::Anonymous), vec!["alpha", "zeta"]);

        assert!(matches!(
            index.list(&alice, &user("carol")),
            Err(IndexError::OwnerNotFound { .. })
        ));
    }
}
