//! Validated names that address users and documents.
//!
//! Username rules:
//! - 1 to 64 characters of `[a-z0-9_-]`
//! - Must start with a letter or digit
//! - Must not be one of the [`RESERVED_USERNAMES`] (they collide with routes)
//!
//! Slug rules:
//! - Non-empty, at most 255 bytes
//! - `/`-separated components, none of them empty, `.` or `..`
//! - No whitespace, control characters, `?` or `#`

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::TypeError;

const MAX_USERNAME_LEN: usize = 64;
const MAX_SLUG_LEN: usize = 255;

/// Top-level path segments taken by fixed routes.
pub const RESERVED_USERNAMES: &[&str] = &["content", "sessions", "users", "forks", "health"];

/// A validated username.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Username(String);

impl Username {
    /// Validate and wrap a username.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        let invalid = |reason: &str| TypeError::InvalidUsername {
            name: name.clone(),
            reason: reason.to_string(),
        };

        if name.is_empty() {
            return Err(invalid("must not be empty"));
        }
        if name.len() > MAX_USERNAME_LEN {
            return Err(invalid("must be at most 64 characters"));
        }
        if let Some(ch) = name
            .chars()
            .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_' || *c == '-'))
        {
            return Err(invalid(&format!("contains forbidden character: {ch:?}")));
        }
        if !name.starts_with(|c: char| c.is_ascii_alphanumeric()) {
            return Err(invalid("must start with a letter or digit"));
        }
        if RESERVED_USERNAMES.contains(&name.as_str()) {
            return Err(invalid("is reserved"));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Username({})", self.0)
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Username {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Username {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(serde::de::Error::custom)
    }
}

/// A validated document slug, unique per owner.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    /// Validate and wrap a slug.
    pub fn new(slug: impl Into<String>) -> Result<Self, TypeError> {
        let slug = slug.into();
        let invalid = |reason: String| TypeError::InvalidSlug {
            slug: slug.clone(),
            reason,
        };

        if slug.is_empty() {
            return Err(invalid("must not be empty".into()));
        }
        if slug.len() > MAX_SLUG_LEN {
            return Err(invalid("must be at most 255 bytes".into()));
        }
        if let Some(ch) = slug
            .chars()
            .find(|c| c.is_whitespace() || c.is_control() || *c == '?' || *c == '#')
        {
            return Err(invalid(format!("contains forbidden character: {ch:?}")));
        }
        for component in slug.split('/') {
            match component {
                "" => return Err(invalid("path components must not be empty".into())),
                "." | ".." => {
                    return Err(invalid(format!("component not allowed: {component:?}")))
                }
                _ => {}
            }
        }
        Ok(Self(slug))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Slug({})", self.0)
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Slug {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Slug {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(serde::de::Error::custom)
    }
}
