//! Deterministic cache keys.
//!
//! A [`Fingerprint`] is the ordered list of caller-visible values that
//! identify a cached resource (type name, ids of the constituent entities,
//! locale, ...). Its [`CacheKey`] is the SHA-256 over a length-prefixed,
//! type-tagged encoding of the parts, so `["ab", "c"]` and `["a", "bc"]` or
//! `[1]` and `["1"]` never collide.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// One scalar component of a fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyPart {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
}

impl KeyPart {
    fn encode_into(&self, hasher: &mut Sha256) {
        match self {
            KeyPart::Null => hasher.update([0u8]),
            KeyPart::Bool(b) => hasher.update([1u8, u8::from(*b)]),
            KeyPart::Int(i) => {
                hasher.update([2u8]);
                hasher.update(i.to_le_bytes());
            }
            KeyPart::Str(s) => {
                hasher.update([3u8]);
                hasher.update((s.len() as u64).to_le_bytes());
                hasher.update(s.as_bytes());
            }
        }
    }
}

impl From<&str> for KeyPart {
    fn from(value: &str) -> Self {
        KeyPart::Str(value.to_string())
    }
}

impl From<String> for KeyPart {
    fn from(value: String) -> Self {
        KeyPart::Str(value)
    }
}

impl From<i64> for KeyPart {
    fn from(value: i64) -> Self {
        KeyPart::Int(value)
    }
}

impl From<i32> for KeyPart {
    fn from(value: i32) -> Self {
        KeyPart::Int(i64::from(value))
    }
}

impl From<bool> for KeyPart {
    fn from(value: bool) -> Self {
        KeyPart::Bool(value)
    }
}

impl<T: Into<KeyPart>> From<Option<T>> for KeyPart {
    fn from(value: Option<T>) -> Self {
        value.map_or(KeyPart::Null, Into::into)
    }
}

/// Ordered key components of a cache entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint {
    parts: Vec<KeyPart>,
}

impl Fingerprint {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn part(mut self, part: impl Into<KeyPart>) -> Self {
        self.parts.push(part.into());
        self
    }

    pub fn push(&mut self, part: impl Into<KeyPart>) {
        self.parts.push(part.into());
    }

    pub fn parts(&self) -> &[KeyPart] {
        &self.parts
    }

    pub fn key(&self) -> CacheKey {
        let mut hasher = Sha256::new();
        hasher.update((self.parts.len() as u64).to_le_bytes());
        for part in &self.parts {
            part.encode_into(&mut hasher);
        }
        CacheKey(hex::encode(hasher.finalize()))
    }
}

impl<P: Into<KeyPart>> FromIterator<P> for Fingerprint {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        Self {
            parts: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Hex SHA-256 digest identifying a cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
