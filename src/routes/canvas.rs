//! REST views over live sessions and the built-in library.
//!
//! Everything here is read-only except `generate`, which runs a prompt to
//! completion for clients that cannot hold a websocket open.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::builtins;
use crate::dispatch::RenderedInstance;
use crate::document::Descriptor;
use crate::registry::Registration;
use crate::services::canvas::{self, CanvasError, Snapshot};
use crate::services::generation::{self, GenerateError};
use crate::state::AppState;

fn canvas_error_to_status(err: CanvasError) -> StatusCode {
    match err {
        CanvasError::SessionNotFound(_) | CanvasError::ComponentNotFound(_) => StatusCode::NOT_FOUND,
        CanvasError::BadRequest(_) | CanvasError::Drop(_) | CanvasError::Edit(_) => StatusCode::BAD_REQUEST,
    }
}

fn generate_error_to_status(err: &GenerateError) -> StatusCode {
    match err {
        GenerateError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        GenerateError::EmptyPrompt => StatusCode::BAD_REQUEST,
        GenerateError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
        GenerateError::Cancelled => StatusCode::CONFLICT,
        _ => StatusCode::BAD_GATEWAY,
    }
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub registrations: Vec<Registration>,
    pub instance_ids: Vec<String>,
}

/// `GET /api/library` — the built-in palette.
pub async fn library() -> Json<Vec<Descriptor>> {
    Json(builtins::library())
}

/// `GET /api/sessions/:id/components` — instances and selection.
pub async fn list_components(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<Snapshot>, StatusCode> {
    canvas::list(&state, session_id)
        .await
        .map(Json)
        .map_err(canvas_error_to_status)
}

/// `GET /api/sessions/:id/render` — resolved render trees in document order.
pub async fn render(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<Vec<RenderedInstance>>, StatusCode> {
    canvas::render(&state, session_id)
        .await
        .map(Json)
        .map_err(canvas_error_to_status)
}

/// `GET /api/sessions/:id/export` — exported code as plain text.
pub async fn export(State(state): State<AppState>, Path(session_id): Path<Uuid>) -> Result<Response, StatusCode> {
    let code = canvas::export(&state, session_id)
        .await
        .map_err(canvas_error_to_status)?;
    Ok(([(CONTENT_TYPE, "text/plain; charset=utf-8")], code).into_response())
}

/// `POST /api/sessions/:id/generate` — generate, register and append.
pub async fn generate(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(body): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, StatusCode> {
    let outcome = generation::handle_prompt(&state, session_id, Uuid::new_v4(), &body.prompt)
        .await
        .map_err(|e| {
            tracing::warn!(%session_id, error = %e, "generate: http request failed");
            generate_error_to_status(&e)
        })?;
    Ok(Json(GenerateResponse {
        registrations: outcome.registrations,
        instance_ids: outcome.instance_ids,
    }))
}
