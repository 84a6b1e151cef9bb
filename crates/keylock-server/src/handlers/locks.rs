//! Lock operation handlers.
//!
//! Each operation is routed as `/{op}/{*key}`. The bare `/{op}` form carries
//! no key and is served by [`missing_key`], which lets the adapter answer
//! BadRequest.

use axum::extract::{Path, State};
use axum::http::{StatusCode, Uri};
use axum::Json;

use keylock_core::{Operation, ResultCode};

use crate::error::ApiError;
use crate::schema::locks::OperationResponse;
use crate::state::AppState;

type OperationResult = Result<(StatusCode, Json<OperationResponse>), ApiError>;

/// `GET /lock/{key}`: 202 or 409.
pub async fn lock(State(state): State<AppState>, Path(key): Path<String>) -> OperationResult {
    apply(&state, Operation::Lock, Some(&key))
}

/// `GET /unlock/{key}`: 202 or 409.
pub async fn unlock(State(state): State<AppState>, Path(key): Path<String>) -> OperationResult {
    apply(&state, Operation::Unlock, Some(&key))
}

/// `GET /rlock/{key}`: 202 or 409.
pub async fn rlock(State(state): State<AppState>, Path(key): Path<String>) -> OperationResult {
    apply(&state, Operation::RLock, Some(&key))
}

/// `GET /runlock/{key}`: always 202.
pub async fn runlock(State(state): State<AppState>, Path(key): Path<String>) -> OperationResult {
    apply(&state, Operation::RUnlock, Some(&key))
}

/// `GET /status/{key}`: 200 (readable) or 423 (locked).
pub async fn status(State(state): State<AppState>, Path(key): Path<String>) -> OperationResult {
    apply(&state, Operation::Status, Some(&key))
}

/// `GET /{op}` or `GET /{op}/` with no key: 400.
pub async fn missing_key(State(state): State<AppState>, uri: Uri) -> OperationResult {
    let op = uri
        .path()
        .trim_matches('/')
        .parse::<Operation>()
        .map_err(ApiError::NotFound)?;
    apply(&state, op, None)
}

fn apply(state: &AppState, op: Operation, key: Option<&str>) -> OperationResult {
    let reply = state.adapter.invoke(op, key);

    match reply.code {
        ResultCode::Conflict => {
            let detail = reply.detail.unwrap_or_else(|| "conflict".to_string());
            tracing::debug!(operation = %op, "{}", detail);
            Err(ApiError::Conflict(detail))
        }
        ResultCode::BadRequest => {
            let detail = reply.detail.unwrap_or_else(|| "missing key".to_string());
            tracing::warn!(operation = %op, "rejected request: {}", detail);
            Err(ApiError::BadRequest(detail))
        }
        code => Ok((status_code(code), Json(OperationResponse::from_reply(reply)))),
    }
}

fn status_code(code: ResultCode) -> StatusCode {
    match code {
        ResultCode::Ok => StatusCode::OK,
        ResultCode::Accepted => StatusCode::ACCEPTED,
        ResultCode::Locked => StatusCode::LOCKED,
        ResultCode::Conflict => StatusCode::CONFLICT,
        ResultCode::BadRequest => StatusCode::BAD_REQUEST,
    }
}
