//! Application state shared by all handlers.
//!
//! [`AppState`] owns the one registry instance for the process, wrapped in
//! an [`OperationAdapter`]. It is built once in `main` and handed to the
//! router; handlers reach the registry only through it.

use std::sync::Arc;

use keylock_core::{LockRegistry, OperationAdapter, RegistryKind};

/// Shared application state for the HTTP server.
///
/// The registry synchronizes internally, so handlers call it directly
/// without any additional lock at this level.
#[derive(Clone)]
pub struct AppState {
    /// Adapter over the process-wide lock registry.
    pub adapter: Arc<OperationAdapter>,
    /// Which registry implementation backs the adapter.
    pub registry_kind: RegistryKind,
}

impl AppState {
    /// Creates state backed by a fresh, empty registry of the given kind.
    pub fn new(kind: RegistryKind) -> Self {
        AppState {
            adapter: Arc::new(OperationAdapter::new(kind.build())),
            registry_kind: kind,
        }
    }

    /// Creates state around an existing registry (for tests that inspect it).
    pub fn with_registry(kind: RegistryKind, registry: Arc<dyn LockRegistry>) -> Self {
        AppState {
            adapter: Arc::new(OperationAdapter::new(registry)),
            registry_kind: kind,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(RegistryKind::default())
    }
}
