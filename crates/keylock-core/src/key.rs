//! Validated lock key newtype.

use std::borrow::Borrow;
use std::fmt;

use serde::Serialize;

use crate::error::LockError;

/// An opaque, non-empty key naming a lockable resource.
///
/// The content is kept verbatim: no trimming, case folding or normalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct LockKey(String);

impl LockKey {
    /// Validates and wraps a key. Empty strings are rejected.
    pub fn new(key: impl Into<String>) -> Result<Self, LockError> {
        let key = key.into();
        if key.is_empty() {
            return Err(LockError::EmptyKey);
        }
        Ok(LockKey(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for LockKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for LockKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for LockKey {
    type Error = LockError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        LockKey::new(value)
    }
}
