use std::fmt;

use chrono::{DateTime, Utc};
use fab_types::Username;

use crate::error::{UserError, UserResult};

const MAX_EMAIL_LEN: usize = 254;

/// A registered user.
///
/// Holds the Argon2id PHC string, never the raw password.
#[derive(Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: Username,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// A validated registration, with the password already hashed.
#[derive(Clone)]
pub struct NewUser {
    pub username: Username,
    pub email: String,
    pub password_hash: String,
}

impl NewUser {
    /// Validate the email and hash the password.
    pub fn new(username: Username, email: &str, password: &str) -> UserResult<Self> {
        let email = validate_email(email)?;
        let password_hash = fab_crypto::hash_password(password)?;
        Ok(Self {
            username,
            email,
            password_hash,
        })
    }
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("username", &self.username)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Trim, lowercase and sanity-check an email address.
///
/// This is a shape check, not deliverability: exactly one `@`, non-empty
/// local part and a dotted domain, no whitespace.
pub fn validate_email(email: &str) -> UserResult<String> {
    let email = email.trim().to_ascii_lowercase();
    let invalid = |reason: &str| UserError::InvalidEmail {
        email: email.clone(),
        reason: reason.to_string(),
    };

    if email.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if email.len() > MAX_EMAIL_LEN {
        return Err(invalid("too long"));
    }
    if email.chars().any(char::is_whitespace) {
        return Err(invalid("must not contain whitespace"));
    }
    let mut parts = email.split('@');
    let (local, domain) = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => (local, domain),
        _ => return Err(invalid("must contain exactly one '@'")),
    };
    if local.is_empty() {
        return Err(invalid("missing local part"));
    }
    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(invalid("domain must be dotted"));
    }
    Ok(email)
}
