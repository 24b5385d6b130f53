//! Dynamic registry — runtime-registered component types.
//!
//! DESIGN
//! ======
//! Descriptors from the generation service are compiled one at a time by
//! the sandbox. Each outcome, success or failure, is written under the
//! descriptor's type id, replacing whatever was there (last write wins).
//! A failure is recorded as an entry and logged; it never escapes to the
//! caller and never stops the remaining descriptors from registering.
//!
//! Compiling is split from inserting. `compile_all` needs only a `Sandbox`
//! and can run anywhere, including off the async runtime; `insert_compiled`
//! is the cheap map write that has to happen under the session lock.
//! `register` does both in one step for synchronous callers.
//!
//! LIFETIME
//! ========
//! Entries are never removed. A registry lives exactly as long as the
//! session that owns it, so growth is bounded by the session, and
//! `len()` is logged on every registration to keep it visible.

pub mod sandbox;

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::document::Descriptor;
use sandbox::{CompileError, Factory, Sandbox};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone)]
pub enum RegistryEntry {
    Compiled { factory: Arc<Factory>, source_code: String },
    Failed { error: String, source_code: String },
}

impl RegistryEntry {
    #[must_use]
    pub fn source_code(&self) -> &str {
        match self {
            Self::Compiled { source_code, .. } | Self::Failed { source_code, .. } => source_code,
        }
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Compiled { .. } => None,
            Self::Failed { error, .. } => Some(error),
        }
    }
}

/// Per-descriptor result of `register_all`, in input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Registration {
    #[serde(rename = "type")]
    pub type_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Registration {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// A descriptor together with the outcome of compiling it, ready to be
/// inserted into a registry.
#[derive(Debug)]
pub struct CompiledDescriptor {
    descriptor: Descriptor,
    outcome: Result<Factory, CompileError>,
}

impl CompiledDescriptor {
    #[must_use]
    pub fn compile(sandbox: &Sandbox, descriptor: &Descriptor) -> Self {
        Self {
            descriptor: descriptor.clone(),
            outcome: sandbox.compile(&descriptor.source_code, &descriptor.props),
        }
    }

    #[must_use]
    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }
}

/// Compile every descriptor independently, in input order.
#[must_use]
pub fn compile_all(sandbox: &Sandbox, descriptors: &[Descriptor]) -> Vec<CompiledDescriptor> {
    descriptors
        .iter()
        .map(|d| CompiledDescriptor::compile(sandbox, d))
        .collect()
}

// =============================================================================
// REGISTRY
// =============================================================================

#[derive(Debug, Default)]
pub struct DynamicRegistry {
    sandbox: Sandbox,
    entries: HashMap<String, RegistryEntry>,
    /// Sample props from the last successful registration of each type.
    /// Kept apart from `entries` so it survives a later failed compile.
    sample_data: HashMap<String, Value>,
}

impl DynamicRegistry {
    #[must_use]
    pub fn new(sandbox: Sandbox) -> Self {
        Self { sandbox, entries: HashMap::new(), sample_data: HashMap::new() }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn entry(&self, type_id: &str) -> Option<&RegistryEntry> {
        self.entries.get(type_id)
    }

    /// Registered type ids, sorted.
    #[must_use]
    pub fn type_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Compile and register every descriptor independently.
    pub fn register_all(&mut self, descriptors: &[Descriptor]) -> Vec<Registration> {
        descriptors.iter().map(|d| self.register(d)).collect()
    }

    /// Compile one descriptor and record the outcome under its type id.
    pub fn register(&mut self, descriptor: &Descriptor) -> Registration {
        let compiled = CompiledDescriptor::compile(&self.sandbox, descriptor);
        self.insert_compiled(compiled)
    }

    /// Record an already-compiled descriptor under its type id. The
    /// returned `Registration` reflects this descriptor's own outcome.
    pub fn insert_compiled(&mut self, compiled: CompiledDescriptor) -> Registration {
        let CompiledDescriptor { descriptor, outcome } = compiled;
        let Descriptor { type_id, source_code, props, .. } = descriptor;
        match outcome {
            Ok(factory) => {
                self.sample_data.insert(type_id.clone(), props);
                self.entries.insert(
                    type_id.clone(),
                    RegistryEntry::Compiled { factory: Arc::new(factory), source_code },
                );
                info!(%type_id, entries = self.entries.len(), "registry: compiled");
                Registration { type_id, error: None }
            }
            Err(e) => {
                let error = e.to_string();
                self.entries.insert(
                    type_id.clone(),
                    RegistryEntry::Failed { error: error.clone(), source_code },
                );
                warn!(%type_id, %error, entries = self.entries.len(), "registry: compile failed");
                Registration { type_id, error: Some(error) }
            }
        }
    }

    /// Compiled renderer for `type_id`, if registered successfully.
    #[must_use]
    pub fn get_dynamic_component(&self, type_id: &str) -> Option<Arc<Factory>> {
        match self.entries.get(type_id)? {
            RegistryEntry::Compiled { factory, .. } => Some(Arc::clone(factory)),
            RegistryEntry::Failed { .. } => None,
        }
    }

    #[must_use]
    pub fn is_dynamic_component(&self, type_id: &str) -> bool {
        self.entries.contains_key(type_id)
    }

    #[must_use]
    pub fn get_dynamic_component_sample_data(&self, type_id: &str) -> Option<&Value> {
        self.sample_data.get(type_id)
    }

    #[must_use]
    pub fn has_compilation_error(&self, type_id: &str) -> bool {
        matches!(self.entries.get(type_id), Some(RegistryEntry::Failed { .. }))
    }

    #[must_use]
    pub fn get_compilation_error(&self, type_id: &str) -> Option<&str> {
        self.entries.get(type_id).and_then(RegistryEntry::error)
    }

    /// Script source for `type_id`, compiled or not.
    #[must_use]
    pub fn source_code(&self, type_id: &str) -> Option<&str> {
        self.entries.get(type_id).map(RegistryEntry::source_code)
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
