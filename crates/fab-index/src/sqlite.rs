//! SQLite-backed document store.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use fab_db::{from_millis, is_unique_violation, to_millis, Database, DbError};
use fab_types::{ContentKey, DocumentId, Slug, Username, Visibility};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::{IndexError, IndexResult};
use crate::traits::DocumentStore;
use crate::types::Document;

const SELECT_DOCUMENT: &str = "SELECT d.id, u.username, d.slug, d.content_key, d.visibility, \
     d.forked_from, d.revision, d.created_at, d.updated_at \
     FROM documents d JOIN users u ON u.id = d.owner_id";

/// [`DocumentStore`] over the `documents` table of the shared [`Database`].
///
/// Owners are resolved against the `users` table, so inserting a document
/// for an unregistered owner fails with [`IndexError::OwnerNotFound`].
#[derive(Debug, Clone)]
pub struct SqliteDocumentStore {
    db: Database,
}

impl SqliteDocumentStore {
    /// Wrap an open database. The schema must already exist.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    fn select_one(&self, filter: &str, params: impl rusqlite::Params) -> IndexResult<Option<Document>> {
        let sql = format!("{SELECT_DOCUMENT} WHERE {filter}");
        Ok(self.db.with_conn(|conn| {
            Ok(conn.query_row(&sql, params, row_to_document).optional()?)
        })?)
    }
}

/// Parse a text column through `FromStr`, reporting failures as conversion
/// errors on that column.
fn parse_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let text: String = row.get(idx)?;
    text.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn row_to_document(row: &Row<'_>) -> rusqlite::Result<Document> {
    let forked_from: Option<String> = row.get(5)?;
    let forked_from = forked_from
        .map(|id| {
            id.parse::<DocumentId>()
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))
        })
        .transpose()?;
    let revision: i64 = row.get(6)?;
    Ok(Document {
        id: parse_column(row, 0)?,
        owner: parse_column(row, 1)?,
        slug: parse_column(row, 2)?,
        content_key: parse_column(row, 3)?,
        visibility: parse_column(row, 4)?,
        forked_from,
        revision: revision.max(0) as u64,
        created_at: from_millis(row.get(7)?),
        updated_at: from_millis(row.get(8)?),
    })
}

fn reload(conn: &Connection, id: &DocumentId) -> rusqlite::Result<Option<Document>> {
    let sql = format!("{SELECT_DOCUMENT} WHERE d.id = ?1");
    conn.query_row(&sql, params![id.to_string()], row_to_document)
        .optional()
}

impl DocumentStore for SqliteDocumentStore {
    fn get(&self, owner: &Username, slug: &Slug) -> IndexResult<Option<Document>> {
        self.select_one(
            "u.username = ?1 AND d.slug = ?2",
            params![owner.as_str(), slug.as_str()],
        )
    }

    fn get_by_id(&self, id: &DocumentId) -> IndexResult<Option<Document>> {
        self.select_one("d.id = ?1", params![id.to_string()])
    }

    fn insert(&self, document: &Document) -> IndexResult<()> {
        let result = self.db.with_conn(|conn| {
            Ok(conn.execute(
                "INSERT INTO documents \
                 (id, owner_id, slug, content_key, visibility, forked_from, revision, created_at, updated_at) \
                 SELECT ?1, u.id, ?3, ?4, ?5, ?6, ?7, ?8, ?9 FROM users u WHERE u.username = ?2",
                params![
                    document.id.to_string(),
                    document.owner.as_str(),
                    document.slug.as_str(),
                    document.content_key.to_hex(),
                    document.visibility.as_str(),
                    document.forked_from.map(|id| id.to_string()),
                    document.revision as i64,
                    to_millis(document.created_at),
                    to_millis(document.updated_at),
                ],
            )?)
        });
        match result {
            Ok(0) => Err(IndexError::OwnerNotFound {
                owner: document.owner.clone(),
            }),
            Ok(_) => Ok(()),
            Err(DbError::Sqlite(e)) if is_unique_violation(&e) => Err(IndexError::Conflict {
                owner: document.owner.clone(),
                slug: document.slug.clone(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn update_content(
        &self,
        id: &DocumentId,
        key: &ContentKey,
        at: DateTime<Utc>,
    ) -> IndexResult<Option<Document>> {
        Ok(self.db.with_conn(|conn| {
            let tx = conn.transaction()?;
            let changed = tx.execute(
                "UPDATE documents SET content_key = ?1, revision = revision + 1, updated_at = ?2 WHERE id = ?3",
                params![key.to_hex(), to_millis(at), id.to_string()],
            )?;
            let doc = if changed == 0 { None } else { reload(&tx, id)? };
            tx.commit()?;
            Ok(doc)
        })?)
    }

    fn set_visibility(
        &self,
        id: &DocumentId,
        visibility: Visibility,
        at: DateTime<Utc>,
    ) -> IndexResult<Option<Document>> {
        Ok(self.db.with_conn(|conn| {
            let tx = conn.transaction()?;
            let changed = tx.execute(
                "UPDATE documents SET visibility = ?1, updated_at = ?2 WHERE id = ?3",
                params![visibility.as_str(), to_millis(at), id.to_string()],
            )?;
            let doc = if changed == 0 { None } else { reload(&tx, id)? };
            tx.commit()?;
            Ok(doc)
        })?)
    }

    fn list_by_owner(&self, owner: &Username) -> IndexResult<Vec<Document>> {
        let sql = format!("{SELECT_DOCUMENT} WHERE u.username = ?1 ORDER BY d.slug");
        Ok(self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let docs = stmt
                .query_map(params![owner.as_str()], row_to_document)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(docs)
        })?)
    }

    fn count(&self) -> IndexResult<usize> {
        let n: i64 = self.db.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM documents", [], |r| r.get(0))?)
        })?;
        Ok(n as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::conformance::{self, at, key, slug, user};

    /// A fresh database with `alice` and `bob` registered.
    fn seeded() -> SqliteDocumentStore {
        let db = Database::in_memory().unwrap();
        db.create_all().unwrap();
        db.with_conn(|conn| {
            conn.execute_batch(
                "INSERT INTO users (username, email, password_hash, created_at) VALUES
                 ('alice', 'alice@example.com', 'x', 0),
                 ('bob', 'bob@example.com', 'x', 0);",
            )?;
            Ok(())
        })
        .unwrap();
        SqliteDocumentStore::new(db)
    }

    #[test]
    fn insert_and_get() {
        conformance::insert_and_get(&seeded());
    }

    #[test]
    fn duplicate_slug_conflicts() {
        conformance::duplicate_slug_conflicts(&seeded());
    }

    #[test]
    fn update_content_bumps_revision() {
        conformance::update_content_bumps_revision(&seeded());
    }

    #[test]
    fn set_visibility_keeps_revision() {
        conformance::set_visibility_keeps_revision(&seeded());
    }

    #[test]
    fn list_by_owner_sorted() {
        conformance::list_by_owner_sorted(&seeded());
    }

    #[test]
    fn fork_link_is_stored() {
        conformance::fork_link_is_stored(&seeded());
    }

    #[test]
    fn unregistered_owner_is_rejected() {
        let store = seeded();
        let doc = Document::new(user("carol"), slug("notes"), key(1), at(0));
        let err = store.insert(&doc).unwrap_err();
        assert!(matches!(err, IndexError::OwnerNotFound { .. }), "got {err:?}");
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn deleting_source_clears_fork_link() {
        let store = seeded();
        let source = Document::new(user("alice"), slug("notes"), key(1), at(0));
        store.insert(&source).unwrap();
        let fork = Document {
            forked_from: Some(source.id),
            ..Document::new(user("bob"), slug("notes"), key(1), at(1))
        };
        store.insert(&fork).unwrap();

        store
            .database()
            .with_conn(|conn| {
                conn.execute("DELETE FROM users WHERE username = 'alice'", [])?;
                Ok(())
            })
            .unwrap();

        assert_eq!(store.get_by_id(&source.id).unwrap(), None);
        let fork = store.get_by_id(&fork.id).unwrap().unwrap();
        assert_eq!(fork.forked_from, None);
        assert_eq!(fork.content_key, key(1));
    }
}
