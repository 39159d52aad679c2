//! Password hashing and verification with Argon2id.
//!
//! Hashes are stored as PHC-format strings
//! (`$argon2id$v=19$m=19456,t=2,p=1$...`) which carry their own salt and
//! parameters. Verification goes through `argon2`'s `PasswordVerifier`,
//! which compares digests in constant time.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use once_cell::sync::Lazy;

/// Errors from password hashing.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PasswordError {
    #[error("failed to hash password: {0}")]
    Hash(String),

    #[error("stored password hash is malformed: {0}")]
    MalformedHash(String),
}

/// Hash a password using Argon2id with a random salt. Returns a PHC string.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::Hash(e.to_string()))
}

/// Verify a password against a PHC-format hash string.
///
/// `Ok(false)` on mismatch; `Err` only if the stored hash cannot be parsed.
pub fn verify_password(password: &str, phc: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(phc).map_err(|e| PasswordError::MalformedHash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Throwaway hash checked when there is no stored hash to check against.
static DECOY_HASH: Lazy<Option<String>> = Lazy::new(|| hash_password("fab-decoy").ok());

/// Spend one Argon2 verification on a decoy hash and return `false`.
///
/// Called for logins naming an unknown user, so they take as long as a
/// wrong password against a real account.
pub fn verify_decoy(password: &str) -> bool {
    if let Some(phc) = DECOY_HASH.as_deref() {
        let _ = verify_password(password, phc);
    }
    false
}
