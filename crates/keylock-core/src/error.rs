//! Error types for keylock-core.
//!
//! Registry operations never block; an illegal transition is reported as a
//! [`LockError::Conflict`] and the caller decides whether to retry.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Why a requested transition was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ConflictReason {
    /// The key is exclusively held.
    WriteLocked,
    /// The key has outstanding shared holds.
    ReadLocked { readers: u64 },
    /// `unlock` on a key that is not exclusively held.
    NotWriteLocked,
}

impl fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictReason::WriteLocked => write!(f, "already locked"),
            ConflictReason::ReadLocked { readers } => {
                write!(f, "held by {} reader(s)", readers)
            }
            ConflictReason::NotWriteLocked => write!(f, "already unlocked"),
        }
    }
}

/// Errors produced by the lock registry and key validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LockError {
    /// A key must contain at least one character.
    #[error("key must not be empty")]
    EmptyKey,

    /// The requested transition is not legal in the key's current state.
    #[error("conflict on '{key}': {reason}")]
    Conflict { key: String, reason: ConflictReason },
}

impl LockError {
    pub(crate) fn conflict(key: &str, reason: ConflictReason) -> Self {
        LockError::Conflict {
            key: key.to_string(),
            reason,
        }
    }
}
