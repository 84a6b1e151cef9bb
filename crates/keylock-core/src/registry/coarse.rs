//! Single-guard registry.

use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{KeyStatus, LockRegistry, RegistryStats};
use crate::error::{ConflictReason, LockError};
use crate::key::LockKey;

/// The write-lock set and the reader counters, always guarded together.
///
/// A key absent from `readers` has zero readers; entries are removed when
/// their count returns to zero.
#[derive(Debug, Default)]
struct LockTable {
    write_locked: HashSet<String>,
    readers: HashMap<String, u64>,
}

/// Registry protected end-to-end by one `RwLock`.
///
/// Mutations hold the exclusive guard for the whole check-and-mutate span;
/// observations take it shared. Operations on unrelated keys serialize
/// against each other.
#[derive(Debug, Default)]
pub struct CoarseRegistry {
    table: RwLock<LockTable>,
}

impl CoarseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // Every mutation is a single set/map call made after all checks, so a
    // panic can never leave the table half-updated. Poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, LockTable> {
        self.table.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, LockTable> {
        self.table.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LockRegistry for CoarseRegistry {
    fn lock(&self, key: &LockKey) -> Result<(), LockError> {
        let mut table = self.write();
        let k = key.as_str();

        if table.write_locked.contains(k) {
            return Err(LockError::conflict(k, ConflictReason::WriteLocked));
        }
        if let Some(&readers) = table.readers.get(k) {
            return Err(LockError::conflict(k, ConflictReason::ReadLocked { readers }));
        }

        table.write_locked.insert(k.to_string());
        Ok(())
    }

    fn unlock(&self, key: &LockKey) -> Result<(), LockError> {
        let mut table = self.write();
        if table.write_locked.remove(key.as_str()) {
            Ok(())
        } else {
            Err(LockError::conflict(key.as_str(), ConflictReason::NotWriteLocked))
        }
    }

    fn rlock(&self, key: &LockKey) -> Result<(), LockError> {
        let mut table = self.write();
        let k = key.as_str();

        if table.write_locked.contains(k) {
            return Err(LockError::conflict(k, ConflictReason::WriteLocked));
        }

        match table.readers.get_mut(k) {
            Some(count) => *count += 1,
            None => {
                table.readers.insert(k.to_string(), 1);
            }
        }
        Ok(())
    }

    fn runlock(&self, key: &LockKey) {
        let mut table = self.write();
        let k = key.as_str();

        let drained = match table.readers.get_mut(k) {
            Some(count) if *count > 1 => {
                *count -= 1;
                false
            }
            Some(_) => true,
            None => false,
        };
        if drained {
            table.readers.remove(k);
        }
    }

    fn status(&self, key: &LockKey) -> KeyStatus {
        if self.read().write_locked.contains(key.as_str()) {
            KeyStatus::Locked
        } else {
            KeyStatus::Readable
        }
    }

    fn readers(&self, key: &LockKey) -> u64 {
        self.read().readers.get(key.as_str()).copied().unwrap_or(0)
    }

    fn stats(&self) -> RegistryStats {
        let table = self.read();
        RegistryStats {
            write_locked: table.write_locked.len(),
            read_locked: table.readers.len(),
        }
    }
}
