//! Table definitions.
//!
//! Uniqueness invariants live here, not in application code: one row per
//! username, one per email, one document per (owner, slug).

pub(crate) const CREATE_ALL: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS documents (
    id TEXT PRIMARY KEY,
    owner_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    slug TEXT NOT NULL,
    content_key TEXT NOT NULL,
    visibility TEXT NOT NULL DEFAULT 'public',
    forked_from TEXT REFERENCES documents(id) ON DELETE SET NULL,
    revision INTEGER NOT NULL DEFAULT 1,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    UNIQUE (owner_id, slug)
);
"#;

pub(crate) const DROP_ALL: &str = r#"
DROP TABLE IF EXISTS documents;
DROP TABLE IF EXISTS users;
"#;
