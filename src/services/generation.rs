//! Generation service — prompt → descriptors → registry + document.
//!
//! DESIGN
//! ======
//! A `DescriptorGenerator` turns a prompt into component descriptors. The
//! production implementation posts to an HTTP endpoint; tests plug in a
//! mock. Generation and script compilation both run without holding the
//! sessions lock; compilation runs on the blocking pool. Only the final
//! insert into the registry and document takes the lock.
//!
//! CANCELLATION
//! ============
//! Every generation gets a `GenerationScope` keyed by its request frame id
//! and stored on the session. A scope is cancelled by an explicit cancel
//! frame, by a newer prompt on the same session, or by the session
//! closing. A cancelled scope's results are discarded before they reach
//! the registry.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::watch;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::GeneratorConfig;
use crate::document::Descriptor;
use crate::registry::{self, Registration};
use crate::state::AppState;

const CONNECT_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("descriptor generator not configured")]
    NotConfigured,
    #[error("session not found: {0}")]
    SessionNotFound(Uuid),
    #[error("prompt is empty")]
    EmptyPrompt,
    #[error("generation cancelled")]
    Cancelled,
    #[error("generator request failed: {0}")]
    Request(String),
    #[error("generator response error: status {status}")]
    Response { status: u16, body: String },
    #[error("generator response parse failed: {0}")]
    Parse(String),
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
    #[error("compile task failed: {0}")]
    CompileTask(String),
}

impl crate::frame::ErrorCode for GenerateError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotConfigured => "E_GENERATOR_NOT_CONFIGURED",
            Self::SessionNotFound(_) => "E_SESSION_NOT_FOUND",
            Self::EmptyPrompt => "E_EMPTY_PROMPT",
            Self::Cancelled => "E_CANCELLED",
            Self::Request(_) => "E_GENERATOR_REQUEST",
            Self::Response { .. } => "E_GENERATOR_RESPONSE",
            Self::Parse(_) => "E_GENERATOR_PARSE",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
            Self::CompileTask(_) => "E_COMPILE_TASK",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Request(_) | Self::Response { status: 429 | 500..=599, .. })
    }
}

// =============================================================================
// GENERATOR
// =============================================================================

#[async_trait]
pub trait DescriptorGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<Vec<Descriptor>, GenerateError>;
}

/// Posts `{"prompt": ...}` to a configured endpoint.
pub struct HttpGenerator {
    http: reqwest::Client,
    url: String,
}

impl HttpGenerator {
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &GeneratorConfig) -> Result<Self, GenerateError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(std::time::Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| GenerateError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, url: config.url.clone() })
    }
}

#[async_trait]
impl DescriptorGenerator for HttpGenerator {
    async fn generate(&self, prompt: &str) -> Result<Vec<Descriptor>, GenerateError> {
        let response = self
            .http
            .post(&self.url)
            .json(&serde_json::json!({ "prompt": prompt }))
            .send()
            .await
            .map_err(|e| GenerateError::Request(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| GenerateError::Request(e.to_string()))?;

        if !(200..300).contains(&status) {
            return Err(GenerateError::Response { status, body: text });
        }

        parse_descriptors(&text)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum GeneratorResponse {
    Bare(Vec<Descriptor>),
    Wrapped { components: Vec<Descriptor> },
}

/// Parse a generator response: a bare descriptor array or `{components: [...]}`.
///
/// # Errors
///
/// Returns `GenerateError::Parse` if the body matches neither shape.
pub fn parse_descriptors(text: &str) -> Result<Vec<Descriptor>, GenerateError> {
    match serde_json::from_str::<GeneratorResponse>(text) {
        Ok(GeneratorResponse::Bare(descriptors) | GeneratorResponse::Wrapped { components: descriptors }) => {
            Ok(descriptors)
        }
        Err(e) => Err(GenerateError::Parse(e.to_string())),
    }
}

// =============================================================================
// SCOPE
// =============================================================================

/// Cancellation scope for one in-flight generation.
#[derive(Debug, Clone)]
pub struct GenerationScope {
    request_id: Uuid,
    cancelled: Arc<watch::Sender<bool>>,
}

impl GenerationScope {
    #[must_use]
    pub fn new(request_id: Uuid) -> Self {
        let (tx, _) = watch::channel(false);
        Self { request_id, cancelled: Arc::new(tx) }
    }

    #[must_use]
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn cancel(&self) {
        self.cancelled.send_replace(true);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.cancelled.borrow()
    }

    /// Resolves once the scope is cancelled.
    pub async fn cancelled(&self) {
        let mut rx = self.cancelled.subscribe();
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

// =============================================================================
// SERVICE
// =============================================================================

/// Result of a completed generation.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub registrations: Vec<Registration>,
    pub instance_ids: Vec<String>,
}

/// Open a scope for `request_id`, superseding any generation already in
/// flight on the session.
///
/// # Errors
///
/// Returns `SessionNotFound` if the session is gone.
pub async fn begin(state: &AppState, session_id: Uuid, request_id: Uuid) -> Result<GenerationScope, GenerateError> {
    let mut sessions = state.sessions.write().await;
    let session = sessions
        .get_mut(&session_id)
        .ok_or(GenerateError::SessionNotFound(session_id))?;

    let superseded = session.generations.len();
    session.cancel_generations();
    if superseded > 0 {
        info!(%session_id, superseded, "generate: superseded in-flight generation");
    }

    let scope = GenerationScope::new(request_id);
    session.generations.insert(request_id, scope.clone());
    Ok(scope)
}

/// Cancel the generation started by `request_id`. Returns false if none.
pub async fn cancel(state: &AppState, session_id: Uuid, request_id: Uuid) -> bool {
    let mut sessions = state.sessions.write().await;
    let Some(scope) = sessions
        .get_mut(&session_id)
        .and_then(|session| session.generations.remove(&request_id))
    else {
        return false;
    };
    scope.cancel();
    info!(%session_id, %request_id, "generate: cancelled");
    true
}

/// Run a generation inside `scope` and register its descriptors.
///
/// # Errors
///
/// Returns `Cancelled` if the scope was cancelled or the session closed
/// before registration, or the generator's own error.
pub async fn run(
    state: &AppState,
    generator: &Arc<dyn DescriptorGenerator>,
    session_id: Uuid,
    scope: &GenerationScope,
    prompt: &str,
) -> Result<GenerationOutcome, GenerateError> {
    info!(%session_id, request_id = %scope.request_id(), prompt_len = prompt.len(), "generate: prompt received");

    let generated = tokio::select! {
        () = scope.cancelled() => Err(GenerateError::Cancelled),
        result = generator.generate(prompt) => result,
    };

    // Compile before locking; script trial renders can be slow.
    let compiled = match generated {
        Ok(descriptors) if !scope.is_cancelled() => {
            let sandbox = state.sandbox.clone();
            tokio::task::spawn_blocking(move || registry::compile_all(&sandbox, &descriptors))
                .await
                .map_err(|e| GenerateError::CompileTask(e.to_string()))
        }
        Ok(descriptors) => {
            info!(%session_id, discarded = descriptors.len(), "generate: discarding cancelled results");
            Err(GenerateError::Cancelled)
        }
        Err(e) => Err(e),
    };

    let mut sessions = state.sessions.write().await;
    let Some(session) = sessions.get_mut(&session_id) else {
        warn!(%session_id, "generate: session closed before results arrived");
        return Err(GenerateError::Cancelled);
    };
    session.generations.remove(&scope.request_id());

    let compiled = compiled?;
    if scope.is_cancelled() {
        info!(%session_id, discarded = compiled.len(), "generate: discarding cancelled results");
        return Err(GenerateError::Cancelled);
    }

    let generated = compiled.len();
    let batch = session
        .store
        .add_compiled_components(&mut session.registry, compiled);

    info!(
        %session_id,
        generated,
        failed = batch.registrations.iter().filter(|r| !r.is_ok()).count(),
        "generate: registered"
    );
    Ok(GenerationOutcome { registrations: batch.registrations, instance_ids: batch.instance_ids })
}

/// Validate, open a scope, and run a generation to completion.
///
/// # Errors
///
/// See `begin` and `run`.
pub async fn handle_prompt(
    state: &AppState,
    session_id: Uuid,
    request_id: Uuid,
    prompt: &str,
) -> Result<GenerationOutcome, GenerateError> {
    let generator = state.generator.clone().ok_or(GenerateError::NotConfigured)?;
    if prompt.trim().is_empty() {
        return Err(GenerateError::EmptyPrompt);
    }
    let scope = begin(state, session_id, request_id).await?;
    run(state, &generator, session_id, &scope, prompt).await
}

#[cfg(test)]
#[path = "generation_test.rs"]
mod tests;
