//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It owns the process-wide pieces (type resolver, script sandbox, optional
//! descriptor generator) and a map of live editing sessions. Each session
//! is the composition root for one document: its store, its dynamic
//! registry, and its in-flight generation scopes live and die together.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::dispatch::TypeResolver;
use crate::document::DocumentStore;
use crate::registry::DynamicRegistry;
use crate::registry::sandbox::Sandbox;
use crate::services::generation::{DescriptorGenerator, GenerationScope};

// =============================================================================
// SESSION
// =============================================================================

/// Per-session live state. Dropped, with its registry, when the session closes.
#[derive(Debug)]
pub struct Session {
    pub store: DocumentStore,
    pub registry: DynamicRegistry,
    /// In-flight generations keyed by the request frame id.
    pub generations: HashMap<Uuid, GenerationScope>,
}

impl Session {
    #[must_use]
    pub fn new(sandbox: Sandbox) -> Self {
        Self { store: DocumentStore::new(), registry: DynamicRegistry::new(sandbox), generations: HashMap::new() }
    }

    /// Cancel every in-flight generation.
    pub fn cancel_generations(&mut self) {
        for scope in self.generations.values() {
            scope.cancel();
        }
        self.generations.clear();
    }
}

// =============================================================================
// APP STATE
// =============================================================================

/// Clone is required by Axum; every field is Arc-wrapped or cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<RwLock<HashMap<Uuid, Session>>>,
    pub resolver: Arc<TypeResolver>,
    pub sandbox: Sandbox,
    /// Optional generator. `None` if `GENERATOR_URL` is not configured.
    pub generator: Option<Arc<dyn DescriptorGenerator>>,
}

impl AppState {
    #[must_use]
    pub fn new(sandbox: Sandbox, generator: Option<Arc<dyn DescriptorGenerator>>) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            resolver: Arc::new(TypeResolver::new()),
            sandbox,
            generator,
        }
    }

    /// Open a fresh session and return its id.
    pub async fn open_session(&self) -> Uuid {
        let session_id = Uuid::new_v4();
        let mut sessions = self.sessions.write().await;
        sessions.insert(session_id, Session::new(self.sandbox.clone()));
        info!(%session_id, live = sessions.len(), "session: opened");
        session_id
    }

    /// Close a session, cancelling its generations. Returns false if unknown.
    pub async fn close_session(&self, session_id: Uuid) -> bool {
        let mut sessions = self.sessions.write().await;
        let Some(mut session) = sessions.remove(&session_id) else {
            return false;
        };
        session.cancel_generations();
        info!(
            %session_id,
            components = session.store.len(),
            registry_entries = session.registry.len(),
            live = sessions.len(),
            "session: closed"
        );
        true
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
