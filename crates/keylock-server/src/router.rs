//! Router assembly for the keylock HTTP API.
//!
//! [`build_router`] wires the handlers to their routes with CORS and
//! tracing middleware layers.

use axum::routing::get;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tower_http::LatencyUnit;
use tracing::Level;

use crate::handlers;
use crate::state::AppState;

/// Builds the complete axum router with all API routes.
///
/// Keys are path segments: everything after `/{op}/` is the key, so keys
/// may contain `/`. A bare `/{op}` or `/{op}/` has no key and answers 400.
/// CORS is permissive: every response allows any origin.
/// TraceLayer logs method, path, status and latency for every request.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/lock", get(handlers::locks::missing_key))
        .route("/lock/", get(handlers::locks::missing_key))
        .route("/lock/{*key}", get(handlers::locks::lock))
        .route("/unlock", get(handlers::locks::missing_key))
        .route("/unlock/", get(handlers::locks::missing_key))
        .route("/unlock/{*key}", get(handlers::locks::unlock))
        .route("/rlock", get(handlers::locks::missing_key))
        .route("/rlock/", get(handlers::locks::missing_key))
        .route("/rlock/{*key}", get(handlers::locks::rlock))
        .route("/runlock", get(handlers::locks::missing_key))
        .route("/runlock/", get(handlers::locks::missing_key))
        .route("/runlock/{*key}", get(handlers::locks::runlock))
        .route("/status", get(handlers::locks::missing_key))
        .route("/status/", get(handlers::locks::missing_key))
        .route("/status/{*key}", get(handlers::locks::status))
        .fallback(handlers::not_found)
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(LatencyUnit::Micros),
                        ),
                )
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
