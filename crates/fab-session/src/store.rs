use std::sync::Arc;
use std::time::Duration;

use fab_crypto::{generate_token, verify_decoy};
use fab_types::{SessionToken, Username};
use fab_users::{UserError, UserRegistry};

use crate::error::{SessionError, SessionResult};
use crate::kv::KvStore;

/// Default session lifetime: 30 days.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

const KEY_PREFIX: &str = "session:";

/// Issues and resolves login sessions.
///
/// Expiry is fixed when the token is minted. Resolving a token does not
/// refresh it.
pub struct SessionStore {
    kv: Arc<dyn KvStore>,
    users: Arc<dyn UserRegistry>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(kv: Arc<dyn KvStore>, users: Arc<dyn UserRegistry>) -> Self {
        Self {
            kv,
            users,
            ttl: DEFAULT_SESSION_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Check `secret` against `username`'s stored hash without opening a
    /// session.
    ///
    /// Unknown users and wrong passwords both fail with
    /// [`SessionError::AuthFailed`], after the same amount of hashing work.
    pub fn verify(&self, username: &Username, secret: &str) -> SessionResult<()> {
        let user = match self.users.find_by_username(username) {
            Ok(user) => user,
            Err(UserError::NotFound { .. }) => {
                verify_decoy(secret);
                tracing::warn!(%username, "login for unknown user");
                return Err(SessionError::AuthFailed);
            }
            Err(e) => return Err(e.into()),
        };
        if !self.users.verify_credential(&user, secret) {
            tracing::warn!(%username, "login with wrong password");
            return Err(SessionError::AuthFailed);
        }
        Ok(())
    }

    /// Verify `secret` for `username` and mint a session token.
    ///
    /// Nothing is written when verification fails.
    pub fn login(&self, username: &Username, secret: &str) -> SessionResult<SessionToken> {
        self.verify(username, secret)?;
        let token = generate_token();
        self.kv
            .set_with_ttl(&session_key(&token), username.as_str(), self.ttl)?;
        tracing::info!(%username, token = token.prefix(), "session created");
        Ok(token)
    }

    /// The username bound to a live token.
    ///
    /// Unknown and expired tokens are both [`SessionError::InvalidSession`].
    pub fn resolve(&self, token: &SessionToken) -> SessionResult<Username> {
        let value = self
            .kv
            .get(&session_key(token))?
            .ok_or(SessionError::InvalidSession)?;
        Username::new(value).map_err(|e| {
            tracing::warn!(token = token.prefix(), error = %e, "session holds an invalid username");
            SessionError::InvalidSession
        })
    }

    /// `true` iff `token` is live and bound to `claimed`.
    pub fn validate(&self, claimed: &Username, token: &SessionToken) -> SessionResult<bool> {
        match self.resolve(token) {
            Ok(username) => Ok(&username == claimed),
            Err(SessionError::InvalidSession) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Invalidate every session.
    pub fn flush_all(&self) -> SessionResult<()> {
        self.kv.flush_all()?;
        tracing::warn!("all sessions flushed");
        Ok(())
    }

    /// Drop expired sessions from the backing store.
    pub fn purge_expired(&self) -> SessionResult<usize> {
        let purged = self.kv.purge_expired()?;
        if purged > 0 {
            tracing::debug!(purged, "expired sessions removed");
        }
        Ok(purged)
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

fn session_key(token: &SessionToken) -> String {
    format!("{KEY_PREFIX}{}", token.as_str())
}
