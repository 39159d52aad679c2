//! The [`UserRegistry`] trait defining the user lookup interface.

use fab_types::Username;

use crate::error::{UserError, UserResult};
use crate::types::{NewUser, User};

/// Storage backend for registered users.
///
/// Implementations must be thread-safe (`Send + Sync`) and enforce that
/// usernames and emails are each unique across all users.
pub trait UserRegistry: Send + Sync {
    /// Look a user up by username.
    ///
    /// Fails with [`UserError::NotFound`] if no such user exists.
    fn find_by_username(&self, username: &Username) -> UserResult<User>;

    /// Register a new user.
    fn register(&self, new_user: NewUser) -> UserResult<User>;

    /// Change a user's email address.
    fn update_email(&self, username: &Username, email: &str) -> UserResult<User>;

    /// Number of registered users.
    fn count(&self) -> UserResult<usize>;

    /// Returns `true` if the user exists.
    fn exists(&self, username: &Username) -> UserResult<bool> {
        match self.find_by_username(username) {
            Ok(_) => Ok(true),
            Err(UserError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Check `secret` against the user's stored hash.
    ///
    /// The comparison itself is done by Argon2's verifier in constant time.
    /// A malformed stored hash counts as a mismatch.
    fn verify_credential(&self, user: &User, secret: &str) -> bool {
        match fab_crypto::verify_password(secret, &user.password_hash) {
            Ok(ok) => ok,
            Err(e) => {
                tracing::warn!(username = %user.username, error = %e, "unusable password hash");
                false
            }
        }
    }
}
