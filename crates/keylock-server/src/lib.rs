//! HTTP front-end for the keylock registry.
//!
//! Binds each registry operation to a `GET` route, decorates every response
//! with a wildcard CORS allowance and request/latency logging, and owns the
//! server configuration. All lock semantics live in `keylock-core`.

pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod schema;
pub mod state;
