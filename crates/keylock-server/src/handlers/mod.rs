//! HTTP handler modules for the keylock API.
//!
//! Handlers are thin: they extract the key, call the
//! [`keylock_core::OperationAdapter`] held in [`crate::state::AppState`],
//! and turn the reply into a response. No lock logic lives here.

pub mod health;
pub mod locks;

use axum::http::Uri;

use crate::error::ApiError;

/// Fallback for unknown routes.
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("no route for {}", uri.path()))
}
