//! Liveness handler.

use axum::extract::State;
use axum::Json;

use crate::schema::health::HealthResponse;
use crate::state::AppState;

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let stats = state.adapter.registry().stats();
    Json(HealthResponse {
        status: "ok",
        registry: state.registry_kind.to_string(),
        write_locked: stats.write_locked,
        read_locked: stats.read_locked,
    })
}
