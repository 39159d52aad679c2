//! In-memory user registry for testing and ephemeral use.

use std::collections::HashMap;

use chrono::Utc;
use fab_types::Username;
use parking_lot::RwLock;

use crate::error::{UserError, UserResult};
use crate::traits::UserRegistry;
use crate::types::{validate_email, NewUser, User};

#[derive(Debug, Default)]
struct Inner {
    users: HashMap<Username, User>,
    next_id: i64,
}

/// An in-memory implementation of [`UserRegistry`].
///
/// Data is lost when the registry is dropped.
#[derive(Debug, Default)]
pub struct InMemoryUserRegistry {
    inner: RwLock<Inner>,
}

impl InMemoryUserRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserRegistry for InMemoryUserRegistry {
    fn find_by_username(&self, username: &Username) -> UserResult<User> {
        self.inner
            .read()
            .users
            .get(username)
            .cloned()
            .ok_or_else(|| UserError::NotFound {
                username: username.clone(),
            })
    }

    fn register(&self, new_user: NewUser) -> UserResult<User> {
        let mut inner = self.inner.write();
        if inner.users.contains_key(&new_user.username) {
            return Err(UserError::UsernameTaken {
                username: new_user.username,
            });
        }
        if inner.users.values().any(|u| u.email == new_user.email) {
            return Err(UserError::EmailTaken {
                email: new_user.email,
            });
        }

        inner.next_id += 1;
        let user = User {
            id: inner.next_id,
            username: new_user.username,
            email: new_user.email,
            password_hash: new_user.password_hash,
            created_at: Utc::now(),
        };
        inner.users.insert(user.username.clone(), user.clone());
        tracing::info!(username = %user.username, "registered user");
        Ok(user)
    }

    fn update_email(&self, username: &Username, email: &str) -> UserResult<User> {
        let email = validate_email(email)?;
        let mut inner = self.inner.write();
        if inner
            .users
            .values()
            .any(|u| u.email == email && &u.username != username)
        {
            return Err(UserError::EmailTaken { email });
        }
        let user = inner
            .users
            .get_mut(username)
            .ok_or_else(|| UserError::NotFound {
                username: username.clone(),
            })?;
        user.email = email;
        Ok(user.clone())
    }

    fn count(&self) -> UserResult<usize> {
        Ok(self.inner.read().users.len())
    }
}
