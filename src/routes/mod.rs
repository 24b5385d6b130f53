//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Binds the websocket endpoint, which carries every editing operation,
//! and a handful of REST views under a single Axum router.

pub mod canvas;
pub mod ws;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/ws", get(ws::handle_ws))
        .route("/api/library", get(canvas::library))
        .route("/api/sessions/{id}/components", get(canvas::list_components))
        .route("/api/sessions/{id}/render", get(canvas::render))
        .route("/api/sessions/{id}/export", get(canvas::export))
        .route("/api/sessions/{id}/generate", post(canvas::generate))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
