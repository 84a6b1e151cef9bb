//! Schema types for the health endpoint.

use serde::Serialize;

/// Response body of `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"`.
    pub status: &'static str,
    /// Registry implementation in use (`coarse` or `sharded`).
    pub registry: String,
    /// Number of keys currently write-locked.
    pub write_locked: usize,
    /// Number of keys with at least one shared hold.
    pub read_locked: usize,
}
