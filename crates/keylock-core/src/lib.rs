//! Advisory exclusive/shared locking on named keys.
//!
//! The crate holds the lock-registry state machine and the translation layer
//! that maps operations on it to transport-level result codes. It has no
//! knowledge of HTTP; `keylock-server` exposes it over the network.

pub mod adapter;
pub mod error;
pub mod key;
pub mod registry;

// Re-export commonly used types
pub use adapter::{Operation, OperationAdapter, Reply, ResultCode};
pub use error::{ConflictReason, LockError};
pub use key::LockKey;
pub use registry::{
    CoarseRegistry, KeyStatus, LockRegistry, RegistryKind, RegistryStats, ShardedRegistry,
};
