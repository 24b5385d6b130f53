//! WebSocket handler — one connection, one editing session.
//!
//! DESIGN
//! ======
//! On upgrade a fresh session is opened and the handler enters a
//! `select!` loop:
//! - Incoming client frames → parse + dispatch by syscall prefix
//! - Frames from spawned generation tasks → forward to client
//!
//! Handler functions validate, call a service, and return an `Outcome`.
//! The dispatch layer turns outcomes into reply frames.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → open session → send `session:connected` with `session_id`
//! 2. Client sends frames → dispatch → handler returns Outcome
//! 3. `generate:prompt` replies with an item, then spawns a task whose
//!    done/error frame arrives later through the connection channel
//! 4. Close → close session (cancels in-flight generations)

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::document::{Descriptor, Direction};
use crate::editor::{EditOp, PropPath};
use crate::frame::{Data, Frame, Status, data_from};
use crate::services::{self, generation::GenerateError};
use crate::state::AppState;

// =============================================================================
// OUTCOME
// =============================================================================

/// Result returned by handler functions.
enum Outcome {
    /// Send done+data to the sender.
    Reply(Data),
    /// Send an empty done to the sender.
    Done,
    /// Send an item to the sender now; a spawned task sends the terminal
    /// frame later through the connection channel.
    Accepted(Data),
}

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState) {
    let session_id = state.open_session().await;

    // Per-connection channel for frames produced by spawned tasks.
    let (client_tx, mut client_rx) = mpsc::channel::<Frame>(64);

    let welcome = Frame::request("session:connected", Data::new())
        .with_session_id(session_id)
        .with_data("session_id", session_id.to_string());
    if send_frame(&mut socket, &welcome).await.is_ok() {
        info!(%session_id, "ws: client connected");

        loop {
            tokio::select! {
                msg = socket.recv() => {
                    let Some(Ok(msg)) = msg else { break };
                    match msg {
                        Message::Text(text) => {
                            for frame in process_inbound_text(&state, session_id, &client_tx, &text).await {
                                let _ = send_frame(&mut socket, &frame).await;
                            }
                        }
                        Message::Close(_) => break,
                        _ => {}
                    }
                }
                Some(frame) = client_rx.recv() => {
                    if send_frame(&mut socket, &frame).await.is_err() {
                        break;
                    }
                }
            }
        }
    }

    state.close_session(session_id).await;
    info!(%session_id, "ws: client disconnected");
}

// =============================================================================
// FRAME DISPATCH
// =============================================================================

/// Parse and process one inbound text frame and return frames for the sender.
async fn process_inbound_text(
    state: &AppState,
    session_id: Uuid,
    client_tx: &mpsc::Sender<Frame>,
    text: &str,
) -> Vec<Frame> {
    let req: Frame = match serde_json::from_str(text) {
        Ok(r) => r,
        Err(e) => {
            warn!(%session_id, error = %e, "ws: invalid inbound frame");
            let err = Frame::request("gateway:error", Data::new()).with_data("message", format!("invalid json: {e}"));
            return vec![err];
        }
    };
    let req = req.with_session_id(session_id);

    info!(%session_id, id = %req.id, syscall = %req.syscall, status = ?req.status, "ws: recv frame");

    if req.status == Status::Cancel {
        if let Some(target) = req.parent_id {
            services::generation::cancel(state, session_id, target).await;
        }
        return vec![];
    }

    let prefix = req.prefix();
    let result = match prefix {
        "canvas" => handle_canvas(state, session_id, &req).await,
        "registry" => handle_registry(state, session_id, &req).await,
        "generate" => handle_generate(state, session_id, client_tx, &req).await,
        _ => Err(req.error(format!("unknown prefix: {prefix}"))),
    };

    match result {
        Ok(Outcome::Reply(data)) => vec![req.done_with(data)],
        Ok(Outcome::Done) => vec![req.done()],
        Ok(Outcome::Accepted(data)) => vec![req.item(data)],
        Err(err_frame) => vec![err_frame],
    }
}

fn op(req: &Frame) -> &str {
    req.syscall.split_once(':').map_or("", |(_, op)| op)
}

fn required_str<'a>(req: &'a Frame, key: &str) -> Result<&'a str, Frame> {
    req.str_field(key)
        .ok_or_else(|| req.error(format!("{key} required")))
}

fn required<T: DeserializeOwned>(req: &Frame, key: &str) -> Result<T, Frame> {
    req.field(key)
        .ok_or_else(|| req.error(format!("{key} missing or malformed")))
}

// =============================================================================
// CANVAS HANDLERS
// =============================================================================

async fn handle_canvas(state: &AppState, session_id: Uuid, req: &Frame) -> Result<Outcome, Frame> {
    let fail = |e: services::canvas::CanvasError| req.error_from(&e);

    match op(req) {
        "add" => {
            let value = Value::Object(req.data.clone().into_iter().collect());
            let descriptor: Descriptor =
                serde_json::from_value(value).map_err(|e| req.error(format!("invalid descriptor: {e}")))?;
            let added = services::canvas::add(state, session_id, &descriptor)
                .await
                .map_err(fail)?;
            Ok(Outcome::Reply(data_from(&added)))
        }
        "drop" => {
            let transfer = required(req, "transfer")?;
            let dropped = services::canvas::drop_payload(state, session_id, &transfer)
                .await
                .map_err(fail)?;
            Ok(Outcome::Reply(data_from(&dropped)))
        }
        "update" => {
            let id = required_str(req, "id")?;
            let props = req.data.get("props").cloned().unwrap_or_else(|| json!({}));
            let updated = services::canvas::update(state, session_id, id, &props)
                .await
                .map_err(fail)?;
            Ok(Outcome::Reply(data_from(&updated)))
        }
        "edit" => {
            let id = required_str(req, "id")?;
            let path: PropPath = required(req, "path")?;
            let edit: EditOp = required(req, "edit")?;
            let edited = services::canvas::edit(state, session_id, id, &path, &edit)
                .await
                .map_err(fail)?;
            Ok(Outcome::Reply(data_from(&edited)))
        }
        "select" => {
            let selected = services::canvas::select(state, session_id, req.str_field("id"))
                .await
                .map_err(fail)?;
            Ok(Outcome::Reply(Data::from([("selected".to_string(), json!(selected))])))
        }
        "delete" => {
            let id = required_str(req, "id")?;
            services::canvas::delete(state, session_id, id)
                .await
                .map_err(fail)?;
            Ok(Outcome::Done)
        }
        "move" => {
            let id = required_str(req, "id")?;
            let direction: Direction = required(req, "direction")?;
            let moved = services::canvas::move_component(state, session_id, id, direction)
                .await
                .map_err(fail)?;
            Ok(Outcome::Reply(Data::from([("moved".to_string(), json!(moved))])))
        }
        "list" => {
            let snapshot = services::canvas::list(state, session_id).await.map_err(fail)?;
            Ok(Outcome::Reply(data_from(&snapshot)))
        }
        "render" => {
            let rendered = services::canvas::render(state, session_id).await.map_err(fail)?;
            let html: Vec<String> = rendered.iter().map(|r| r.node.to_html()).collect();
            Ok(Outcome::Reply(Data::from([
                ("components".to_string(), json!(rendered)),
                ("html".to_string(), json!(html)),
            ])))
        }
        "export" => {
            let code = services::canvas::export(state, session_id).await.map_err(fail)?;
            Ok(Outcome::Reply(Data::from([("code".to_string(), json!(code))])))
        }
        "inspect" => {
            let inspection = services::canvas::inspect(state, session_id, req.str_field("id"))
                .await
                .map_err(fail)?;
            Ok(Outcome::Reply(data_from(&inspection)))
        }
        other => Err(req.error(format!("unknown canvas op: {other}"))),
    }
}

// =============================================================================
// REGISTRY HANDLERS
// =============================================================================

async fn handle_registry(state: &AppState, session_id: Uuid, req: &Frame) -> Result<Outcome, Frame> {
    match op(req) {
        "status" => {
            let entries = services::canvas::registry_status(state, session_id)
                .await
                .map_err(|e| req.error_from(&e))?;
            Ok(Outcome::Reply(Data::from([("entries".to_string(), json!(entries))])))
        }
        other => Err(req.error(format!("unknown registry op: {other}"))),
    }
}

// =============================================================================
// GENERATE HANDLERS
// =============================================================================

async fn handle_generate(
    state: &AppState,
    session_id: Uuid,
    client_tx: &mpsc::Sender<Frame>,
    req: &Frame,
) -> Result<Outcome, Frame> {
    match op(req) {
        "prompt" => {
            let Some(generator) = state.generator.clone() else {
                return Err(req.error_from(&GenerateError::NotConfigured));
            };
            let prompt = req.str_field("prompt").unwrap_or("").to_string();
            if prompt.trim().is_empty() {
                return Err(req.error_from(&GenerateError::EmptyPrompt));
            }

            let scope = services::generation::begin(state, session_id, req.id)
                .await
                .map_err(|e| req.error_from(&e))?;

            let accepted = Data::from([("generating".to_string(), json!(true))]);
            let state = state.clone();
            let client_tx = client_tx.clone();
            let req = req.clone();
            tokio::spawn(async move {
                let frame = match services::generation::run(&state, &generator, session_id, &scope, &prompt).await {
                    Ok(outcome) => req.done_with(Data::from([
                        ("registrations".to_string(), json!(outcome.registrations)),
                        ("instance_ids".to_string(), json!(outcome.instance_ids)),
                    ])),
                    Err(e) => req.error_from(&e),
                };
                if client_tx.send(frame).await.is_err() {
                    warn!(%session_id, "generate: connection gone before reply");
                }
            });
            Ok(Outcome::Accepted(accepted))
        }
        other => Err(req.error(format!("unknown generate op: {other}"))),
    }
}

// =============================================================================
// HELPERS
// =============================================================================

async fn send_frame(socket: &mut WebSocket, frame: &Frame) -> Result<(), ()> {
    let json = match serde_json::to_string(frame) {
        Ok(j) => j,
        Err(e) => {
            warn!(error = %e, "ws: failed to serialize frame");
            return Err(());
        }
    };
    if frame.status == Status::Error {
        let code = frame.str_field(crate::frame::FRAME_CODE).unwrap_or("-");
        let message = frame.str_field(crate::frame::FRAME_MESSAGE).unwrap_or("-");
        warn!(id = %frame.id, syscall = %frame.syscall, code, message, "ws: send frame status=Error");
    } else {
        info!(id = %frame.id, syscall = %frame.syscall, status = ?frame.status, terminal = frame.status.is_terminal(), "ws: send frame");
    }
    socket
        .send(Message::Text(json.into()))
        .await
        .map_err(|_| ())
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
