//! The lock-registry state machine.
//!
//! Each key is in one of three logical states: unlocked, write-locked, or
//! read-locked by `n >= 1` holders. A key is never write-locked and
//! read-locked at the same time. Every mutating operation decides its outcome
//! from the state it observes under the same guard acquisition that performs
//! the mutation, so concurrent callers racing for one key are serialized.
//!
//! Two implementations are provided:
//! - [`CoarseRegistry`]: one reader/writer lock over the whole table.
//! - [`ShardedRegistry`]: per-shard guards via `DashMap`, so unrelated keys
//!   do not contend. Single-key atomicity is identical.

mod coarse;
mod sharded;

pub use coarse::CoarseRegistry;
pub use sharded::ShardedRegistry;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;

use crate::error::LockError;
use crate::key::LockKey;

/// Observable status of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStatus {
    /// Exclusively held.
    Locked,
    /// Not exclusively held. Shared holders never make a key unreadable.
    Readable,
}

/// Point-in-time counts of held keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub write_locked: usize,
    pub read_locked: usize,
}

/// Authoritative lock state for all keys.
///
/// No operation blocks waiting for a key: each call either applies its
/// transition immediately or fails immediately with
/// [`LockError::Conflict`]. There is no ownership; any caller may release
/// any key.
pub trait LockRegistry: Send + Sync {
    /// Unlocked -> WriteLocked. Conflicts if the key is write-locked or has
    /// any readers.
    fn lock(&self, key: &LockKey) -> Result<(), LockError>;

    /// WriteLocked -> Unlocked. Conflicts if the key is not write-locked;
    /// read holds are neither inspected nor touched.
    fn unlock(&self, key: &LockKey) -> Result<(), LockError>;

    /// Adds one shared hold. Conflicts if the key is write-locked.
    fn rlock(&self, key: &LockKey) -> Result<(), LockError>;

    /// Drops one shared hold if any exist; otherwise a no-op. Never fails.
    fn runlock(&self, key: &LockKey);

    /// [`KeyStatus::Locked`] iff the key is write-locked.
    fn status(&self, key: &LockKey) -> KeyStatus;

    /// Number of outstanding shared holds on `key`.
    fn readers(&self, key: &LockKey) -> u64;

    /// Counts of write-locked and read-locked keys.
    fn stats(&self) -> RegistryStats;
}

/// Which registry implementation to construct.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RegistryKind {
    #[default]
    Coarse,
    Sharded,
}

impl RegistryKind {
    /// Builds a fresh, empty registry of this kind.
    pub fn build(self) -> Arc<dyn LockRegistry> {
        match self {
            RegistryKind::Coarse => Arc::new(CoarseRegistry::new()),
            RegistryKind::Sharded => Arc::new(ShardedRegistry::new()),
        }
    }
}

impl fmt::Display for RegistryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryKind::Coarse => f.write_str("coarse"),
            RegistryKind::Sharded => f.write_str("sharded"),
        }
    }
}

impl FromStr for RegistryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "coarse" => Ok(RegistryKind::Coarse),
            "sharded" => Ok(RegistryKind::Sharded),
            other => Err(format!(
                "invalid registry kind '{}': expected 'coarse' or 'sharded'",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConflictReason;

    fn key(s: &str) -> LockKey {
        LockKey::new(s).unwrap()
    }

    /// Runs a check against both implementations.
    fn for_each_registry(check: impl Fn(&dyn LockRegistry)) {
        for kind in [RegistryKind::Coarse, RegistryKind::Sharded] {
            let registry = kind.build();
            check(registry.as_ref());
        }
    }

    #[test]
    fn lock_then_unlock_leaves_key_readable() {
        for_each_registry(|r| {
            let k = key("blah");
            assert_eq!(r.lock(&k), Ok(()));
            assert_eq!(r.status(&k), KeyStatus::Locked);
            assert_eq!(r.unlock(&k), Ok(()));
            assert_eq!(r.status(&k), KeyStatus::Readable);
        });
    }

    #[test]
    fn second_lock_conflicts() {
        for_each_registry(|r| {
            let k = key("blah");
            r.lock(&k).unwrap();
            assert_eq!(
                r.lock(&k),
                Err(LockError::Conflict {
                    key: "blah".into(),
                    reason: ConflictReason::WriteLocked
                })
            );
        });
    }

    #[test]
    fn lock_conflicts_with_readers() {
        for_each_registry(|r| {
            let k = key("blah");
            r.rlock(&k).unwrap();
            r.rlock(&k).unwrap();
            assert_eq!(
                r.lock(&k),
                Err(LockError::Conflict {
                    key: "blah".into(),
                    reason: ConflictReason::ReadLocked { readers: 2 }
                })
            );
            r.runlock(&k);
            assert!(r.lock(&k).is_err());
            r.runlock(&k);
            assert_eq!(r.lock(&k), Ok(()));
        });
    }

    #[test]
    fn rlock_conflicts_with_writer() {
        for_each_registry(|r| {
            let k = key("blah");
            r.lock(&k).unwrap();
            assert_eq!(
                r.rlock(&k),
                Err(LockError::Conflict {
                    key: "blah".into(),
                    reason: ConflictReason::WriteLocked
                })
            );
            assert_eq!(r.readers(&k), 0);
            r.unlock(&k).unwrap();
            assert_eq!(r.rlock(&k), Ok(()));
            assert_eq!(r.readers(&k), 1);
        });
    }

    #[test]
    fn unlock_unknown_key_conflicts() {
        for_each_registry(|r| {
            assert_eq!(
                r.unlock(&key("never-seen")),
                Err(LockError::Conflict {
                    key: "never-seen".into(),
                    reason: ConflictReason::NotWriteLocked
                })
            );
        });
    }

    #[test]
    fn unlock_does_not_touch_readers() {
        for_each_registry(|r| {
            let k = key("blah");
            r.rlock(&k).unwrap();
            assert!(r.unlock(&k).is_err());
            assert_eq!(r.readers(&k), 1);
        });
    }

    #[test]
    fn read_locked_key_is_readable() {
        for_each_registry(|r| {
            let k = key("blah");
            r.rlock(&k).unwrap();
            assert_eq!(r.status(&k), KeyStatus::Readable);
        });
    }

    #[test]
    fn runlock_past_zero_is_noop() {
        for_each_registry(|r| {
            let k = key("blah");
            r.runlock(&k);
            r.runlock(&k);
            assert_eq!(r.readers(&k), 0);
            assert_eq!(r.stats(), RegistryStats::default());
        });
    }

    #[test]
    fn runlock_leaves_write_lock_alone() {
        for_each_registry(|r| {
            let k = key("blah");
            r.lock(&k).unwrap();
            r.runlock(&k);
            assert_eq!(r.status(&k), KeyStatus::Locked);
        });
    }

    #[test]
    fn keys_are_independent() {
        for_each_registry(|r| {
            r.lock(&key("a")).unwrap();
            r.rlock(&key("b")).unwrap();
            r.rlock(&key("b")).unwrap();
            assert_eq!(r.status(&key("b")), KeyStatus::Readable);
            assert_eq!(r.lock(&key("c")), Ok(()));
            assert_eq!(
                r.stats(),
                RegistryStats {
                    write_locked: 2,
                    read_locked: 1
                }
            );
        });
    }

    #[test]
    fn registry_kind_parses() {
        assert_eq!("coarse".parse::<RegistryKind>(), Ok(RegistryKind::Coarse));
        assert_eq!("Sharded".parse::<RegistryKind>(), Ok(RegistryKind::Sharded));
        assert!("global".parse::<RegistryKind>().is_err());
        assert_eq!(RegistryKind::default().to_string(), "coarse");
    }
}
