use std::sync::Arc;

use chrono::{DateTime, Utc};
use fab_db::Database;
use fab_index::{Document, DocumentIndex, SqliteDocumentStore, Upserted};
use fab_session::{open_kv, SessionError, SessionStore};
use fab_store::{BlobBackend, ContentStore, FsBlobBackend, InMemoryBlobBackend, View};
use fab_types::{
    Clock, ContentKey, Requester, SessionToken, Slug, SystemClock, Username, Visibility,
};
use fab_users::{NewUser, SqliteUserRegistry, User, UserRegistry};
use serde::Serialize;

use crate::config::FabConfig;
use crate::error::{SdkError, SdkResult};

/// A user's public face: who they are and which documents the viewer may see.
#[derive(Clone, Debug, Serialize)]
pub struct Profile {
    pub username: Username,
    pub joined: DateTime<Utc>,
    pub documents: Vec<Document>,
}

/// High-level fab API.
///
/// Cheap to share behind an `Arc`. All calls block on their backing stores.
pub struct Fab {
    content: ContentStore,
    users: Arc<dyn UserRegistry>,
    index: DocumentIndex,
    sessions: SessionStore,
    db: Database,
}

impl Fab {
    /// Open every store named by `config`. Tables are not created; call
    /// [`syncdb`](Self::syncdb) for that.
    pub fn open(config: &FabConfig) -> SdkResult<Self> {
        Self::open_with_clock(config, Arc::new(SystemClock))
    }

    /// Like [`open`](Self::open), with timestamps and session expiry driven
    /// by `clock`.
    pub fn open_with_clock(config: &FabConfig, clock: Arc<dyn Clock>) -> SdkResult<Self> {
        let backend: Arc<dyn BlobBackend> = match &config.blob_root {
            Some(root) => Arc::new(FsBlobBackend::new(root, config.bucket.clone())?),
            None => Arc::new(InMemoryBlobBackend::new(config.bucket.clone())),
        };
        let content = ContentStore::new(backend)?.with_max_blob_size(config.max_blob_size);

        let db = Database::open(&config.database_url)?;
        let users: Arc<dyn UserRegistry> = Arc::new(SqliteUserRegistry::new(db.clone()));
        let index = DocumentIndex::new(Arc::new(SqliteDocumentStore::new(db.clone())), users.clone())
            .with_clock(clock.clone());
        let sessions = SessionStore::new(open_kv(&config.session_url, clock)?, users.clone())
            .with_ttl(config.session_ttl);

        tracing::info!(
            bucket = %config.bucket,
            database = %config.database_url,
            sessions = %config.session_url,
            "fab opened"
        );
        Ok(Self {
            content,
            users,
            index,
            sessions,
            db,
        })
    }

    /// A fully in-memory instance with its schema in place.
    pub fn in_memory() -> SdkResult<Self> {
        let fab = Self::open(&FabConfig::in_memory())?;
        fab.syncdb()?;
        Ok(fab)
    }

    // ---- Documents ----

    /// Store `data` and bind `owner/slug` to it. Only the owner may publish.
    pub fn publish(
        &self,
        requester: &Requester,
        owner: &str,
        slug: &str,
        data: &[u8],
    ) -> SdkResult<Upserted> {
        let (owner, slug) = parse_path(owner, slug)?;
        let key = self.content.store(data)?;
        Ok(self.index.upsert(requester, &owner, &slug, &key)?)
    }

    /// The body of `owner/slug`, raw or rendered.
    pub fn read(
        &self,
        requester: &Requester,
        owner: &str,
        slug: &str,
        view: View,
    ) -> SdkResult<Vec<u8>> {
        let (owner, slug) = parse_path(owner, slug)?;
        let key = self.index.resolve(requester, &owner, &slug)?;
        Ok(self.content.fetch(&key, view)?)
    }

    /// The record for `owner/slug`.
    pub fn document(&self, requester: &Requester, owner: &str, slug: &str) -> SdkResult<Document> {
        let (owner, slug) = parse_path(owner, slug)?;
        Ok(self.index.document(requester, &owner, &slug)?)
    }

    /// Fork `owner/slug` into the requester's namespace, at `new_slug` or
    /// the same slug.
    pub fn fork(
        &self,
        requester: &Requester,
        owner: &str,
        slug: &str,
        new_slug: Option<&str>,
    ) -> SdkResult<Document> {
        let source = self.document(requester, owner, slug)?;
        let new_slug = new_slug.map(Slug::new).transpose()?;
        Ok(self.index.fork(requester, &source.id, new_slug)?)
    }

    pub fn set_visibility(
        &self,
        requester: &Requester,
        owner: &str,
        slug: &str,
        visibility: Visibility,
    ) -> SdkResult<Document> {
        let (owner, slug) = parse_path(owner, slug)?;
        Ok(self.index.set_visibility(requester, &owner, &slug, visibility)?)
    }

    // ---- Anonymous content ----

    /// Store `data` without binding it to any document.
    pub fn post_anonymous(&self, data: &[u8]) -> SdkResult<ContentKey> {
        Ok(self.content.store(data)?)
    }

    /// Fetch content by its hex key.
    pub fn fetch(&self, key: &str, view: View) -> SdkResult<Vec<u8>> {
        let key: ContentKey = key.parse()?;
        Ok(self.content.fetch(&key, view)?)
    }

    /// MIME type of rendered views.
    pub fn rendered_content_type(&self) -> &'static str {
        self.content.rendered_content_type()
    }

    // ---- Users ----

    pub fn register(&self, username: &str, email: &str, password: &str) -> SdkResult<User> {
        let new_user = NewUser::new(Username::new(username)?, email, password)?;
        Ok(self.users.register(new_user)?)
    }

    /// `username` and the documents of theirs the requester may read.
    pub fn profile(&self, requester: &Requester, username: &str) -> SdkResult<Profile> {
        let username = Username::new(username)?;
        let user = self.users.find_by_username(&username)?;
        let documents = self.index.list(requester, &username)?;
        Ok(Profile {
            username: user.username,
            joined: user.created_at,
            documents,
        })
    }

    /// Change a user's email. Only that user may do this.
    pub fn update_email(&self, requester: &Requester, username: &str, email: &str) -> SdkResult<User> {
        let username = Username::new(username)?;
        if !requester.is(&username) {
            return Err(SdkError::PermissionDenied(format!(
                "{requester} may not edit the profile of {username}"
            )));
        }
        Ok(self.users.update_email(&username, email)?)
    }

    // ---- Sessions ----

    /// Verify a password and open a session.
    pub fn login(&self, username: &str, password: &str) -> SdkResult<SessionToken> {
        // A name that cannot exist is just another failed login.
        let username = Username::new(username).map_err(|_| SessionError::AuthFailed)?;
        Ok(self.sessions.login(&username, password)?)
    }

    /// The requester a username and password stand for, without opening a
    /// session. For one-shot local tools that have no use for a token.
    pub fn authenticate_password(&self, username: &str, password: &str) -> SdkResult<Requester> {
        let username = Username::new(username).map_err(|_| SessionError::AuthFailed)?;
        self.sessions.verify(&username, password)?;
        Ok(Requester::user(username))
    }

    /// The user bound to a live session token.
    pub fn session_user(&self, token: &str) -> SdkResult<Username> {
        Ok(self.sessions.resolve(&SessionToken::new(token))?)
    }

    /// The requester a bearer token stands for.
    pub fn authenticate(&self, token: &str) -> SdkResult<Requester> {
        self.session_user(token).map(Requester::User)
    }

    pub fn flush_sessions(&self) -> SdkResult<()> {
        Ok(self.sessions.flush_all()?)
    }

    // ---- Administration ----

    /// Create every table that does not exist yet.
    pub fn syncdb(&self) -> SdkResult<()> {
        Ok(self.db.create_all()?)
    }

    /// Log everyone out and drop every table.
    pub fn clear(&self) -> SdkResult<()> {
        self.sessions.flush_all()?;
        self.db.drop_all()?;
        Ok(())
    }

    pub fn content(&self) -> &ContentStore {
        &self.content
    }

    pub fn index(&self) -> &DocumentIndex {
        &self.index
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }
}

impl std::fmt::Debug for Fab {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fab")
            .field("content", &self.content)
            .field("db", &self.db)
            .finish_non_exhaustive()
    }
}

fn parse_path(owner: &str, slug: &str) -> SdkResult<(Username, Slug)> {
    Ok((Username::new(owner)?, Slug::new(slug)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use rand::RngCore;
    use std::collections::HashSet;
    use std::time::Duration;

    fn fab_with_alice() -> (Fab, Requester) {
        let fab = Fab::in_memory().unwrap();
        fab.register("alice", "alice@example.com", "s3cret").unwrap();
        (fab, Requester::user(Username::new("alice").unwrap()))
    }

    // -----------------------------------------------------------------------
    // End to end
    // -----------------------------------------------------------------------

    #[test]
    fn publish_resolve_fetch_render() {
        let (fab, alice) = fab_with_alice();
        let published = fab.publish(&alice, "alice", "notes", b"# Hello").unwrap();
        assert!(published.created);

        let key = fab.document(&alice, "alice", "notes").unwrap().content_key;
        assert_eq!(key, fab.content().key_for(b"# Hello"));

        let anyone = Requester::Anonymous;
        assert_eq!(fab.read(&anyone, "alice", "notes", View::Raw).unwrap(), b"# Hello");
        assert_eq!(
            fab.read(&anyone, "alice", "notes", View::Rendered).unwrap(),
            b"<h1>Hello</h1>\n"
        );
        assert_eq!(fab.fetch(&key.to_hex(), View::Raw).unwrap(), b"# Hello");
    }

    #[test]
    fn password_authentication_opens_no_session() {
        let (fab, alice) = fab_with_alice();
        assert_eq!(fab.authenticate_password("alice", "s3cret").unwrap(), alice);
        for (user, password) in [("alice", "wrong"), ("nobody", "s3cret"), ("Not A Name", "x")] {
            let err = fab.authenticate_password(user, password).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::AuthFailed, "{user}/{password}");
        }
    }

    #[test]
    fn login_then_publish_with_session() {
        let (fab, _) = fab_with_alice();
        let token = fab.login("alice", "s3cret").unwrap();
        let requester = fab.authenticate(token.as_str()).unwrap();
        fab.publish(&requester, "alice", "notes", b"hi").unwrap();

        assert_eq!(fab.login("alice", "nope").unwrap_err().kind(), ErrorKind::AuthFailed);
        assert_eq!(fab.login("No Such User", "x").unwrap_err().kind(), ErrorKind::AuthFailed);
        assert_eq!(fab.authenticate("bogus").unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn concurrent_publishes_leave_one_document() {
        use std::thread;

        let (fab, alice) = fab_with_alice();
        let fab = Arc::new(fab);
        let handles: Vec<_> = (0..50)
            .map(|_| {
                let fab = Arc::clone(&fab);
                let alice = alice.clone();
                thread::spawn(move || {
                    let mut data = vec![0u8; 32];
                    rand::thread_rng().fill_bytes(&mut data);
                    fab.publish(&alice, "alice", "notes", &data).unwrap()
                })
            })
            .collect();
        let results: Vec<Upserted> = handles
            .into_iter()
            .map(|h| h.join().expect("thread should not panic"))
            .collect();

        let ids: HashSet<_> = results.iter().map(|r| r.document.id).collect();
        assert_eq!(ids.len(), 1);
        assert_eq!(fab.index().store().count().unwrap(), 1);

        let last = results.iter().max_by_key(|r| r.document.revision).unwrap();
        assert_eq!(last.document.revision, 50);
        let current = fab.document(&alice, "alice", "notes").unwrap();
        assert_eq!(current.content_key, last.document.content_key);
    }

    // -----------------------------------------------------------------------
    // Failures
    // -----------------------------------------------------------------------

    #[test]
    fn missing_things_are_not_found() {
        let (fab, alice) = fab_with_alice();
        let anyone = Requester::Anonymous;
        assert!(fab.read(&anyone, "alice", "nothing", View::Raw).unwrap_err().is_not_found());
        assert!(fab.read(&anyone, "carol", "notes", View::Raw).unwrap_err().is_not_found());
        assert!(fab.fetch(&"00".repeat(32), View::Raw).unwrap_err().is_not_found());
        assert!(fab.profile(&alice, "carol").unwrap_err().is_not_found());
    }

    #[test]
    fn malformed_input_is_invalid() {
        let (fab, alice) = fab_with_alice();
        for err in [
            fab.fetch("not-hex", View::Raw).unwrap_err(),
            fab.publish(&alice, "alice", "../escape", b"x").unwrap_err(),
            fab.register("Bad Name", "x@example.com", "pw").unwrap_err(),
            fab.register("carol", "not-an-email", "pw").unwrap_err(),
        ] {
            assert_eq!(err.kind(), ErrorKind::InvalidInput, "{err}");
        }
    }

    #[test]
    fn oversized_payload_is_invalid_input() {
        let config = FabConfig {
            max_blob_size: 8,
            ..FabConfig::in_memory()
        };
        let fab = Fab::open(&config).unwrap();
        let err = fab.post_anonymous(&[0u8; 9]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn taken_names_conflict() {
        let (fab, _) = fab_with_alice();
        let dup_name = fab.register("alice", "other@example.com", "pw").unwrap_err();
        assert_eq!(dup_name.kind(), ErrorKind::Conflict);
        let dup_email = fab.register("bob", "alice@example.com", "pw").unwrap_err();
        assert_eq!(dup_email.kind(), ErrorKind::Conflict);
    }

    // -----------------------------------------------------------------------
    // Authorization
    // -----------------------------------------------------------------------

    #[test]
    fn only_owner_writes() {
        let (fab, _) = fab_with_alice();
        fab.register("bob", "bob@example.com", "pw").unwrap();
        let bob = Requester::user(Username::new("bob").unwrap());

        for requester in [Requester::Anonymous, bob] {
            let err = fab.publish(&requester, "alice", "notes", b"x").unwrap_err();
            assert_eq!(err.kind(), ErrorKind::PermissionDenied);
        }
    }

    #[test]
    fn private_documents_and_profiles() {
        let (fab, alice) = fab_with_alice();
        fab.publish(&alice, "alice", "public", b"a").unwrap();
        fab.publish(&alice, "alice", "diary", b"b").unwrap();
        fab.set_visibility(&alice, "alice", "diary", Visibility::Private).unwrap();

        let anyone = Requester::Anonymous;
        let err = fab.read(&anyone, "alice", "diary", View::Raw).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);

        let own = fab.profile(&alice, "alice").unwrap();
        assert_eq!(own.documents.len(), 2);
        let public = fab.profile(&anyone, "alice").unwrap();
        assert_eq!(public.documents.len(), 1);
        assert_eq!(public.documents[0].slug.as_str(), "public");
    }

    #[test]
    fn only_the_user_edits_their_email() {
        let (fab, alice) = fab_with_alice();
        let err = fab
            .update_email(&Requester::Anonymous, "alice", "new@example.com")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);

        let user = fab.update_email(&alice, "alice", "New@Example.com").unwrap();
        assert_eq!(user.email, "new@example.com");
    }

    // -----------------------------------------------------------------------
    // Forks
    // -----------------------------------------------------------------------

    #[test]
    fn fork_diverges_from_source() {
        let (fab, alice) = fab_with_alice();
        fab.register("bob", "bob@example.com", "pw").unwrap();
        let bob = Requester::user(Username::new("bob").unwrap());

        let source = fab.publish(&alice, "alice", "notes", b"v1").unwrap().document;
        let fork = fab.fork(&bob, "alice", "notes", Some("my-notes")).unwrap();
        assert_eq!(fork.forked_from, Some(source.id));

        fab.publish(&alice, "alice", "notes", b"v2").unwrap();
        assert_eq!(fab.read(&bob, "bob", "my-notes", View::Raw).unwrap(), b"v1");

        fab.publish(&bob, "bob", "my-notes", b"bob's").unwrap();
        assert_eq!(fab.read(&bob, "alice", "notes", View::Raw).unwrap(), b"v2");
    }

    // -----------------------------------------------------------------------
    // Administration and persistence
    // -----------------------------------------------------------------------

    #[test]
    fn clear_drops_everything() {
        let (fab, alice) = fab_with_alice();
        let token = fab.login("alice", "s3cret").unwrap();
        fab.publish(&alice, "alice", "notes", b"x").unwrap();

        fab.clear().unwrap();
        assert!(fab.session_user(token.as_str()).is_err());

        fab.syncdb().unwrap();
        assert!(fab.profile(&Requester::Anonymous, "alice").unwrap_err().is_not_found());
    }

    #[test]
    fn state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let config = FabConfig {
            bucket: "docs".into(),
            blob_root: Some(dir.path().join("blobs")),
            database_url: dir.path().join("fab.db").display().to_string(),
            session_url: dir.path().join("sessions.db").display().to_string(),
            ..FabConfig::in_memory()
        };

        let token = {
            let fab = Fab::open(&config).unwrap();
            fab.syncdb().unwrap();
            fab.register("alice", "alice@example.com", "s3cret").unwrap();
            let token = fab.login("alice", "s3cret").unwrap();
            let alice = fab.authenticate(token.as_str()).unwrap();
            fab.publish(&alice, "alice", "notes", b"# Persisted").unwrap();
            token
        };

        let fab = Fab::open(&config).unwrap();
        assert_eq!(fab.session_user(token.as_str()).unwrap().as_str(), "alice");
        assert_eq!(
            fab.read(&Requester::Anonymous, "alice", "notes", View::Raw).unwrap(),
            b"# Persisted"
        );
    }

    #[test]
    fn session_ttl_follows_config() {
        let clock = Arc::new(fab_types::ManualClock::starting_now());
        let config = FabConfig {
            session_ttl: Duration::from_secs(60),
            ..FabConfig::in_memory()
        };
        let fab = Fab::open_with_clock(&config, clock.clone()).unwrap();
        fab.syncdb().unwrap();
        fab.register("alice", "alice@example.com", "s3cret").unwrap();
        let token = fab.login("alice", "s3cret").unwrap();

        clock.advance(Duration::from_secs(59));
        assert!(fab.session_user(token.as_str()).is_ok());
        clock.advance(Duration::from_secs(1));
        assert!(fab.session_user(token.as_str()).is_err());
    }

    #[test]
    fn profile_serializes() {
        let (fab, alice) = fab_with_alice();
        fab.publish(&alice, "alice", "notes", b"x").unwrap();
        let json = serde_json::to_value(fab.profile(&alice, "alice").unwrap()).unwrap();
        assert_eq!(json["username"], "alice");
        assert_eq!(json["documents"][0]["slug"], "notes");
    }
}
