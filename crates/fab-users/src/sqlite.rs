//! SQLite-backed user registry.

use fab_db::{from_millis, is_unique_violation, to_millis, Database, DbError};
use fab_types::Username;
use rusqlite::{params, OptionalExtension, Row};

use crate::error::{UserError, UserResult};
use crate::traits::UserRegistry;
use crate::types::{validate_email, NewUser, User};

const SELECT_USER: &str =
    "SELECT id, username, email, password_hash, created_at FROM users WHERE username = ?1";

/// [`UserRegistry`] over the `users` table of the shared [`Database`].
#[derive(Debug, Clone)]
pub struct SqliteUserRegistry {
    db: Database,
}

impl SqliteUserRegistry {
    /// Wrap an open database. The schema must already exist
    /// ([`Database::create_all`]).
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    let username: String = row.get(1)?;
    let username = Username::new(username).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(User {
        id: row.get(0)?,
        username,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        created_at: from_millis(row.get(4)?),
    })
}

/// Map a unique violation on `users` to the column that caused it.
fn unique_violation(err: &rusqlite::Error, username: &Username, email: &str) -> Option<UserError> {
    if !is_unique_violation(err) {
        return None;
    }
    if err.to_string().contains("users.email") {
        Some(UserError::EmailTaken {
            email: email.to_string(),
        })
    } else {
        Some(UserError::UsernameTaken {
            username: username.clone(),
        })
    }
}

impl UserRegistry for SqliteUserRegistry {
    fn find_by_username(&self, username: &Username) -> UserResult<User> {
        let found = self.db.with_conn(|conn| {
            Ok(conn
                .query_row(SELECT_USER, params![username.as_str()], row_to_user)
                .optional()?)
        })?;
        found.ok_or_else(|| UserError::NotFound {
            username: username.clone(),
        })
    }

    fn register(&self, new_user: NewUser) -> UserResult<User> {
        let created_at = chrono::Utc::now();
        let result = self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (username, email, password_hash, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    new_user.username.as_str(),
                    new_user.email,
                    new_user.password_hash,
                    to_millis(created_at)
                ],
            )?;
            Ok(conn.last_insert_rowid())
        });

        let id = match result {
            Ok(id) => id,
            Err(DbError::Sqlite(e)) => {
                return Err(unique_violation(&e, &new_user.username, &new_user.email)
                    .unwrap_or_else(|| UserError::Database(DbError::Sqlite(e))));
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(username = %new_user.username, "registered user");
        Ok(User {
            id,
            username: new_user.username,
            email: new_user.email,
            password_hash: new_user.password_hash,
            created_at: from_millis(to_millis(created_at)),
        })
    }

    fn update_email(&self, username: &Username, email: &str) -> UserResult<User> {
        let email = validate_email(email)?;
        let result = self.db.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE users SET email = ?1 WHERE username = ?2",
                params![email, username.as_str()],
            )?)
        });
        match result {
            Ok(0) => Err(UserError::NotFound {
                username: username.clone(),
            }),
            Ok(_) => self.find_by_username(username),
            Err(DbError::Sqlite(e)) => Err(unique_violation(&e, username, &email)
                .unwrap_or_else(|| UserError::Database(DbError::Sqlite(e)))),
            Err(e) => Err(e.into()),
        }
    }

    fn count(&self) -> UserResult<usize> {
        let n: i64 = self
            .db
            .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?))?;
        Ok(n as usize)
    }
}
