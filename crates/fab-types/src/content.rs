use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Content-addressed key for a stored blob.
///
/// A `ContentKey` is the BLAKE3 fingerprint of a blob's bytes. Identical
/// content always produces the same key, which is what makes blob writes
/// idempotent. The canonical text form is 64 lowercase hex characters and is
/// what appears in URLs, JSON, and database rows.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentKey([u8; 32]);

impl ContentKey {
    /// Length of the canonical text form.
    pub const HEX_LEN: usize = 64;

    pub const fn from_hash(hash: [u8; 32]) -> Self {
        Self(hash)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// The canonical 64-character lowercase form.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First four bytes, for logs.
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Parse the canonical form. Uppercase digits are rejected so that every
    /// key has exactly one URL.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        if s.len() != Self::HEX_LEN {
            return Err(TypeError::InvalidLength {
                expected: Self::HEX_LEN,
                actual: s.len(),
            });
        }
        if s.bytes().any(|b| b.is_ascii_uppercase()) {
            return Err(TypeError::InvalidHex(format!("{s:?} is not lowercase")));
        }
        let mut hash = [0u8; 32];
        hex::decode_to_slice(s, &mut hash).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        Ok(Self(hash))
    }
}

impl fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentKey({})", self.short_hex())
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for ContentKey {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<[u8; 32]> for ContentKey {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl Serialize for ContentKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
