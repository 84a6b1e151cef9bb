//! Translation from (operation, key) requests to result codes.
//!
//! [`OperationAdapter`] performs the missing-key check, delegates to the
//! registry, and maps the outcome. It has no other side effects.
//!
//! | Registry outcome                  | Result code  |
//! |-----------------------------------|--------------|
//! | lock/unlock/rlock succeeded       | Accepted     |
//! | lock/unlock/rlock conflicted      | Conflict     |
//! | runlock                           | Accepted     |
//! | status = Locked                   | Locked       |
//! | status = Readable                 | Ok           |
//! | key missing or empty              | BadRequest   |

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;

use crate::error::LockError;
use crate::key::LockKey;
use crate::registry::{KeyStatus, LockRegistry};

/// An addressable registry operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Lock,
    Unlock,
    RLock,
    RUnlock,
    Status,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::Lock,
        Operation::Unlock,
        Operation::RLock,
        Operation::RUnlock,
        Operation::Status,
    ];

    /// Wire name, also used as the route segment.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Lock => "lock",
            Operation::Unlock => "unlock",
            Operation::RLock => "rlock",
            Operation::RUnlock => "runlock",
            Operation::Status => "status",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| format!("unknown operation '{}'", s))
    }
}

/// Transport-level result of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultCode {
    Ok,
    Accepted,
    Conflict,
    Locked,
    BadRequest,
}

impl ResultCode {
    /// The HTTP status code carrying this result.
    pub fn http_status(&self) -> u16 {
        match self {
            ResultCode::Ok => 200,
            ResultCode::Accepted => 202,
            ResultCode::BadRequest => 400,
            ResultCode::Conflict => 409,
            ResultCode::Locked => 423,
        }
    }

    /// Inverse of [`ResultCode::http_status`]; `None` for any other status.
    pub fn from_http_status(status: u16) -> Option<Self> {
        match status {
            200 => Some(ResultCode::Ok),
            202 => Some(ResultCode::Accepted),
            400 => Some(ResultCode::BadRequest),
            409 => Some(ResultCode::Conflict),
            423 => Some(ResultCode::Locked),
            _ => None,
        }
    }

    /// Accepted or Ok.
    pub fn is_success(&self) -> bool {
        matches!(self, ResultCode::Ok | ResultCode::Accepted)
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResultCode::Ok => "ok",
            ResultCode::Accepted => "accepted",
            ResultCode::Conflict => "conflict",
            ResultCode::Locked => "locked",
            ResultCode::BadRequest => "bad_request",
        };
        f.write_str(s)
    }
}

/// Outcome of one adapted operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reply {
    pub operation: Operation,
    /// The key as received; `None` when it was missing or empty.
    pub key: Option<LockKey>,
    pub code: ResultCode,
    /// Explanation for Conflict and BadRequest replies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Binds operations to a shared [`LockRegistry`].
#[derive(Clone)]
pub struct OperationAdapter {
    registry: Arc<dyn LockRegistry>,
}

impl OperationAdapter {
    pub fn new(registry: Arc<dyn LockRegistry>) -> Self {
        OperationAdapter { registry }
    }

    /// The registry this adapter delegates to.
    pub fn registry(&self) -> &Arc<dyn LockRegistry> {
        &self.registry
    }

    /// Runs `op` against `key`. A missing or empty key yields BadRequest
    /// without touching the registry.
    pub fn invoke(&self, op: Operation, key: Option<&str>) -> Reply {
        let key = match key.map(LockKey::new) {
            Some(Ok(key)) => key,
            Some(Err(err)) => return Reply::bad_request(op, err.to_string()),
            None => return Reply::bad_request(op, "missing key".to_string()),
        };

        let (code, detail) = match op {
            Operation::Lock => Self::transition(self.registry.lock(&key)),
            Operation::Unlock => Self::transition(self.registry.unlock(&key)),
            Operation::RLock => Self::transition(self.registry.rlock(&key)),
            Operation::RUnlock => {
                self.registry.runlock(&key);
                (ResultCode::Accepted, None)
            }
            Operation::Status => match self.registry.status(&key) {
                KeyStatus::Locked => (ResultCode::Locked, None),
                KeyStatus::Readable => (ResultCode::Ok, None),
            },
        };

        Reply {
            operation: op,
            key: Some(key),
            code,
            detail,
        }
    }

    fn transition(result: Result<(), LockError>) -> (ResultCode, Option<String>) {
        match result {
            Ok(()) => (ResultCode::Accepted, None),
            Err(err @ LockError::Conflict { .. }) => (ResultCode::Conflict, Some(err.to_string())),
            Err(err @ LockError::EmptyKey) => (ResultCode::BadRequest, Some(err.to_string())),
        }
    }
}

impl Reply {
    fn bad_request(operation: Operation, detail: String) -> Self {
        Reply {
            operation,
            key: None,
            code: ResultCode::BadRequest,
            detail: Some(detail),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{CoarseRegistry, RegistryStats};

    fn adapter() -> OperationAdapter {
        OperationAdapter::new(Arc::new(CoarseRegistry::new()))
    }

    fn run(adapter: &OperationAdapter, steps: &[(Operation, &str)]) -> Vec<ResultCode> {
        steps
            .iter()
            .map(|(op, key)| adapter.invoke(*op, Some(key)).code)
            .collect()
    }

    use Operation::*;
    use ResultCode as R;

    #[test]
    fn lock_unlock_status() {
        let a = adapter();
        assert_eq!(
            run(&a, &[(Lock, "blah"), (Unlock, "blah"), (Status, "blah")]),
            vec![R::Accepted, R::Accepted, R::Ok]
        );
    }

    #[test]
    fn rlock_blocks_lock_until_runlock() {
        let a = adapter();
        assert_eq!(
            run(
                &a,
                &[(RLock, "blah"), (Lock, "blah"), (RUnlock, "blah"), (Lock, "blah")]
            ),
            vec![R::Accepted, R::Conflict, R::Accepted, R::Accepted]
        );
    }

    #[test]
    fn lock_blocks_rlock_until_unlock() {
        let a = adapter();
        assert_eq!(
            run(
                &a,
                &[(Lock, "blah"), (RLock, "blah"), (Unlock, "blah"), (RLock, "blah")]
            ),
            vec![R::Accepted, R::Conflict, R::Accepted, R::Accepted]
        );
    }

    #[test]
    fn lock_status_lock() {
        let a = adapter();
        assert_eq!(
            run(&a, &[(Lock, "blah"), (Status, "blah"), (Lock, "blah")]),
            vec![R::Accepted, R::Locked, R::Conflict]
        );
    }

    #[test]
    fn unlock_never_seen_key() {
        let a = adapter();
        assert_eq!(run(&a, &[(Unlock, "blah")]), vec![R::Conflict]);
    }

    #[test]
    fn status_tracks_lock_lifecycle() {
        let a = adapter();
        assert_eq!(
            run(
                &a,
                &[
                    (Status, "blah"),
                    (Lock, "blah"),
                    (Status, "blah"),
                    (Unlock, "blah"),
                    (Status, "blah")
                ]
            ),
            vec![R::Ok, R::Accepted, R::Locked, R::Accepted, R::Ok]
        );
    }

    #[test]
    fn missing_or_empty_key_is_bad_request() {
        let a = adapter();
        for op in Operation::ALL {
            let missing = a.invoke(op, None);
            assert_eq!(missing.code, R::BadRequest);
            assert_eq!(missing.key, None);

            let empty = a.invoke(op, Some(""));
            assert_eq!(empty.code, R::BadRequest);
        }
        assert_eq!(a.registry().stats(), RegistryStats::default());
    }

    #[test]
    fn conflict_reply_carries_detail() {
        let a = adapter();
        a.invoke(Lock, Some("blah"));
        let reply = a.invoke(Lock, Some("blah"));
        assert_eq!(reply.code, R::Conflict);
        assert_eq!(reply.detail.as_deref(), Some("conflict on 'blah': already locked"));
    }

    #[test]
    fn http_status_round_trips() {
        for code in [R::Ok, R::Accepted, R::Conflict, R::Locked, R::BadRequest] {
            assert_eq!(ResultCode::from_http_status(code.http_status()), Some(code));
        }
        assert_eq!(ResultCode::from_http_status(500), None);
    }

    #[test]
    fn operation_wire_names() {
        assert_eq!("runlock".parse::<Operation>(), Ok(RUnlock));
        assert_eq!(RLock.to_string(), "rlock");
        assert!("LOCK".parse::<Operation>().is_err());
    }
}
