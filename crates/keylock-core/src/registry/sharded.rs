//! Per-shard registry backed by `DashMap`.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::{KeyStatus, LockRegistry, RegistryStats};
use crate::error::{ConflictReason, LockError};
use crate::key::LockKey;

/// Per-key lock state. An absent entry is `Unlocked`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyState {
    WriteLocked,
    ReadLocked(u64),
}

/// Registry that keeps each key's state in a `DashMap` entry.
///
/// Every check-and-mutate runs while holding the guard of the shard that
/// owns the key, so single-key atomicity matches [`super::CoarseRegistry`]
/// while keys in different shards proceed in parallel.
///
/// [`LockRegistry::stats`] walks the shards one at a time and is therefore
/// not a consistent snapshot under concurrent mutation.
#[derive(Debug, Default)]
pub struct ShardedRegistry {
    keys: DashMap<String, KeyState>,
}

impl ShardedRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LockRegistry for ShardedRegistry {
    fn lock(&self, key: &LockKey) -> Result<(), LockError> {
        match self.keys.entry(key.as_str().to_string()) {
            Entry::Occupied(entry) => {
                let reason = match *entry.get() {
                    KeyState::WriteLocked => ConflictReason::WriteLocked,
                    KeyState::ReadLocked(readers) => ConflictReason::ReadLocked { readers },
                };
                Err(LockError::conflict(key.as_str(), reason))
            }
            Entry::Vacant(entry) => {
                entry.insert(KeyState::WriteLocked);
                Ok(())
            }
        }
    }

    fn unlock(&self, key: &LockKey) -> Result<(), LockError> {
        self.keys
            .remove_if(key.as_str(), |_, state| *state == KeyState::WriteLocked)
            .map(|_| ())
            .ok_or_else(|| LockError::conflict(key.as_str(), ConflictReason::NotWriteLocked))
    }

    fn rlock(&self, key: &LockKey) -> Result<(), LockError> {
        match self.keys.entry(key.as_str().to_string()) {
            Entry::Occupied(mut entry) => match entry.get_mut() {
                KeyState::WriteLocked => {
                    Err(LockError::conflict(key.as_str(), ConflictReason::WriteLocked))
                }
                KeyState::ReadLocked(readers) => {
                    *readers += 1;
                    Ok(())
                }
            },
            Entry::Vacant(entry) => {
                entry.insert(KeyState::ReadLocked(1));
                Ok(())
            }
        }
    }

    fn runlock(&self, key: &LockKey) {
        // Decrement in place; remove the entry when the last reader leaves.
        self.keys
            .remove_if_mut(key.as_str(), |_, state| match state {
                KeyState::ReadLocked(readers) if *readers > 1 => {
                    *readers -= 1;
                    false
                }
                KeyState::ReadLocked(_) => true,
                KeyState::WriteLocked => false,
            });
    }

    fn status(&self, key: &LockKey) -> KeyStatus {
        match self.keys.get(key.as_str()).as_deref() {
            Some(KeyState::WriteLocked) => KeyStatus::Locked,
            _ => KeyStatus::Readable,
        }
    }

    fn readers(&self, key: &LockKey) -> u64 {
        match self.keys.get(key.as_str()).as_deref() {
            Some(KeyState::ReadLocked(readers)) => *readers,
            _ => 0,
        }
    }

    fn stats(&self) -> RegistryStats {
        self.keys
            .iter()
            .fold(RegistryStats::default(), |mut stats, entry| {
                match entry.value() {
                    KeyState::WriteLocked => stats.write_locked += 1,
                    KeyState::ReadLocked(_) => stats.read_locked += 1,
                }
                stats
            })
    }
}
