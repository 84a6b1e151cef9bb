//! Schema types for lock operation responses.

use serde::Serialize;

use keylock_core::{Operation, Reply, ResultCode};

/// Body of a non-error lock operation reply (Accepted, OK or Locked).
///
/// Conflict and BadRequest replies use the error envelope instead.
#[derive(Debug, Clone, Serialize)]
pub struct OperationResponse {
    /// Operation that was applied.
    pub operation: Operation,
    /// The key, exactly as extracted from the path.
    pub key: String,
    /// Result code, mirrored by the HTTP status.
    pub result: ResultCode,
}

impl OperationResponse {
    pub fn from_reply(reply: Reply) -> Self {
        OperationResponse {
            operation: reply.operation,
            key: reply.key.map(|k| k.into_inner()).unwrap_or_default(),
            result: reply.code,
        }
    }
}
