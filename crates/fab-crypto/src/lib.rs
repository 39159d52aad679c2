//! Cryptographic primitives for fab.
//!
//! Content keys come from BLAKE3 in key-derivation mode. Passwords are
//! hashed with Argon2id, and session tokens are drawn from the OS RNG.

pub mod hasher;
pub mod password;
pub mod token;

pub use hasher::ContentHasher;
pub use password::{hash_password, verify_decoy, verify_password, PasswordError};
pub use token::{generate_token, TOKEN_BYTES};
