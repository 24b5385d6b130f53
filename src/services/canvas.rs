//! Canvas service — document operations over a live session.
//!
//! DESIGN
//! ======
//! Each function takes the sessions write (or read) lock for exactly one
//! synchronous store/registry operation, so every mutation is atomic with
//! respect to every other. The store itself stays total: unknown ids are
//! no-ops there. This layer reports them as `ComponentNotFound` so wire
//! clients get an answer.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::dispatch::{RenderedInstance, Tier};
use crate::document::{ComponentInstance, Descriptor, Direction};
use crate::drop::{DropError, handle_drop};
use crate::editor::{EditError, EditOp, FieldNode, PropPath, apply_edit, build_editor, schema_for};
use crate::export::export_document;
use crate::state::{AppState, Session};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CanvasError {
    #[error("session not found: {0}")]
    SessionNotFound(Uuid),
    #[error("component not found: {0}")]
    ComponentNotFound(String),
    #[error("invalid request: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Drop(#[from] DropError),
    #[error(transparent)]
    Edit(#[from] EditError),
}

impl crate::frame::ErrorCode for CanvasError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::SessionNotFound(_) => "E_SESSION_NOT_FOUND",
            Self::ComponentNotFound(_) => "E_COMPONENT_NOT_FOUND",
            Self::BadRequest(_) => "E_BAD_REQUEST",
            Self::Drop(e) => e.error_code(),
            Self::Edit(e) => e.error_code(),
        }
    }
}

/// Document snapshot: instances in order plus the selection.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub components: Vec<ComponentInstance>,
    pub selected: Option<String>,
}

/// Everything the property panel needs for one instance.
#[derive(Debug, Clone, Serialize)]
pub struct Inspection {
    pub component: ComponentInstance,
    pub tier: Tier,
    pub canonical_name: String,
    pub available: bool,
    pub editor: FieldNode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compile_error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegistryStatus {
    #[serde(rename = "type")]
    pub type_id: String,
    pub compiled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// =============================================================================
// SESSION ACCESS
// =============================================================================

async fn with_session<R>(state: &AppState, session_id: Uuid, f: impl FnOnce(&Session) -> R) -> Result<R, CanvasError> {
    let sessions = state.sessions.read().await;
    let session = sessions
        .get(&session_id)
        .ok_or(CanvasError::SessionNotFound(session_id))?;
    Ok(f(session))
}

async fn with_session_mut<R>(
    state: &AppState,
    session_id: Uuid,
    f: impl FnOnce(&mut Session) -> R,
) -> Result<R, CanvasError> {
    let mut sessions = state.sessions.write().await;
    let session = sessions
        .get_mut(&session_id)
        .ok_or(CanvasError::SessionNotFound(session_id))?;
    Ok(f(session))
}

fn instance(session: &Session, id: &str) -> Result<ComponentInstance, CanvasError> {
    session
        .store
        .get(id)
        .cloned()
        .ok_or_else(|| CanvasError::ComponentNotFound(id.to_string()))
}

// =============================================================================
// MUTATIONS
// =============================================================================

pub async fn add(state: &AppState, session_id: Uuid, descriptor: &Descriptor) -> Result<ComponentInstance, CanvasError> {
    if descriptor.type_id.trim().is_empty() {
        return Err(CanvasError::BadRequest("type is required".into()));
    }
    with_session_mut(state, session_id, |session| {
        let id = session.store.add_component(descriptor);
        info!(%session_id, %id, type_id = %descriptor.type_id, "canvas: added");
        instance(session, &id)
    })
    .await?
}

pub async fn drop_payload(
    state: &AppState,
    session_id: Uuid,
    transfer: &HashMap<String, String>,
) -> Result<ComponentInstance, CanvasError> {
    with_session_mut(state, session_id, |session| {
        let id = handle_drop(&mut session.store, &session.registry, transfer)?;
        instance(session, &id)
    })
    .await?
}

/// Shallow-merge `partial` into an instance's props.
pub async fn update(
    state: &AppState,
    session_id: Uuid,
    id: &str,
    partial: &Value,
) -> Result<ComponentInstance, CanvasError> {
    with_session_mut(state, session_id, |session| {
        instance(session, id)?;
        session.store.update_component(id, partial);
        instance(session, id)
    })
    .await?
}

/// Apply one property-editor operation and write the result back.
pub async fn edit(
    state: &AppState,
    session_id: Uuid,
    id: &str,
    path: &PropPath,
    op: &EditOp,
) -> Result<ComponentInstance, CanvasError> {
    let resolver = state.resolver.clone();
    with_session_mut(state, session_id, |session| {
        let current = instance(session, id)?;
        let schema = schema_for(&current, &resolver, &session.registry);
        let next = apply_edit(&current.props, &schema, path, op)?;
        session.store.update_component(id, &next);
        instance(session, id)
    })
    .await?
}

pub async fn select(state: &AppState, session_id: Uuid, id: Option<&str>) -> Result<Option<String>, CanvasError> {
    with_session_mut(state, session_id, |session| {
        session.store.select_component(id);
        session.store.selected_id().map(str::to_string)
    })
    .await
}

pub async fn delete(state: &AppState, session_id: Uuid, id: &str) -> Result<(), CanvasError> {
    with_session_mut(state, session_id, |session| {
        if session.store.delete_component(id) {
            info!(%session_id, %id, "canvas: deleted");
            Ok(())
        } else {
            Err(CanvasError::ComponentNotFound(id.to_string()))
        }
    })
    .await?
}

/// Returns whether the instance actually moved.
pub async fn move_component(
    state: &AppState,
    session_id: Uuid,
    id: &str,
    direction: Direction,
) -> Result<bool, CanvasError> {
    with_session_mut(state, session_id, |session| {
        instance(session, id)?;
        Ok(session.store.move_component(id, direction))
    })
    .await?
}

// =============================================================================
// QUERIES
// =============================================================================

pub async fn list(state: &AppState, session_id: Uuid) -> Result<Snapshot, CanvasError> {
    with_session(state, session_id, |session| Snapshot {
        components: session.store.components().to_vec(),
        selected: session.store.selected_id().map(str::to_string),
    })
    .await
}

pub async fn render(state: &AppState, session_id: Uuid) -> Result<Vec<RenderedInstance>, CanvasError> {
    let resolver = state.resolver.clone();
    with_session(state, session_id, |session| resolver.render_document(&session.store, &session.registry)).await
}

pub async fn export(state: &AppState, session_id: Uuid) -> Result<String, CanvasError> {
    let resolver = state.resolver.clone();
    with_session(state, session_id, |session| export_document(&session.store, &resolver, &session.registry)).await
}

/// Editor tree and resolution details for one instance; the selected
/// instance when `id` is `None`.
pub async fn inspect(state: &AppState, session_id: Uuid, id: Option<&str>) -> Result<Inspection, CanvasError> {
    let resolver = state.resolver.clone();
    with_session(state, session_id, |session| {
        let target = match id {
            Some(id) => instance(session, id)?,
            None => session
                .store
                .selected_component()
                .cloned()
                .ok_or_else(|| CanvasError::BadRequest("no component selected".into()))?,
        };
        let schema = schema_for(&target, &resolver, &session.registry);
        Ok(Inspection {
            tier: resolver.resolve(&target.type_id, &session.registry).tier(),
            canonical_name: resolver.canonical_name(&target.type_id),
            available: session
                .store
                .is_component_available(&session.registry, &target.type_id),
            editor: build_editor(&target.props, &schema),
            compile_error: session
                .registry
                .get_compilation_error(&target.type_id)
                .map(str::to_string),
            component: target,
        })
    })
    .await?
}

pub async fn registry_status(state: &AppState, session_id: Uuid) -> Result<Vec<RegistryStatus>, CanvasError> {
    with_session(state, session_id, |session| {
        session
            .registry
            .type_ids()
            .into_iter()
            .map(|type_id| RegistryStatus {
                type_id: type_id.to_string(),
                compiled: !session.registry.has_compilation_error(type_id),
                error: session
                    .registry
                    .get_compilation_error(type_id)
                    .map(str::to_string),
            })
            .collect()
    })
    .await
}

#[cfg(test)]
#[path = "canvas_test.rs"]
mod tests;
