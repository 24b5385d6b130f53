//! Document store — the ordered sequence of placed component instances.
//!
//! DESIGN
//! ======
//! A `DocumentStore` owns the instances of one session plus the current
//! selection. Every operation is a total, synchronous state transition:
//! unknown ids are no-ops, never errors, so UI events can be replayed
//! without guarding. Order in the sequence is the only placement signal;
//! `position` is carried for clients but never read here.
//!
//! Selection is held as an id, not a snapshot, so an update to the
//! selected instance is visible through `selected_component()` without a
//! separate refresh step. The store keeps the invariant that the selected
//! id is always present in the sequence.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use rand::distr::Alphanumeric;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::props::shallow_merge;
use crate::registry::{CompiledDescriptor, DynamicRegistry, Registration};

const ID_SUFFIX_LEN: usize = 9;

// =============================================================================
// TYPES
// =============================================================================

/// Vestigial 2-D position. Not used for layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// A placed occurrence of a component type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentInstance {
    pub id: String,
    #[serde(rename = "type")]
    pub type_id: String,
    pub category: String,
    pub props: Value,
    #[serde(default)]
    pub position: Position,
}

/// Blueprint for an instance, either from the static library or from the
/// generation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Descriptor {
    #[serde(rename = "type")]
    pub type_id: String,
    #[serde(default)]
    pub category: String,
    #[serde(rename = "sourceCode", default)]
    pub source_code: String,
    #[serde(default)]
    pub props: Value,
}

impl Descriptor {
    pub fn new(type_id: impl Into<String>, category: impl Into<String>, props: Value) -> Self {
        Self { type_id: type_id.into(), category: category.into(), source_code: String::new(), props }
    }

    #[must_use]
    pub fn with_source(mut self, source_code: impl Into<String>) -> Self {
        self.source_code = source_code.into();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

/// Instances appended for one generated batch, plus each descriptor's own
/// registration outcome, both in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GeneratedBatch {
    pub instance_ids: Vec<String>,
    pub registrations: Vec<Registration>,
}

// =============================================================================
// STORE
// =============================================================================

#[derive(Debug, Default, Clone, PartialEq)]
pub struct DocumentStore {
    components: Vec<ComponentInstance>,
    selected: Option<String>,
}

impl DocumentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn components(&self) -> &[ComponentInstance] {
        &self.components
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ComponentInstance> {
        self.components.iter().find(|c| c.id == id)
    }

    #[must_use]
    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    #[must_use]
    pub fn selected_component(&self) -> Option<&ComponentInstance> {
        self.selected.as_deref().and_then(|id| self.get(id))
    }

    /// Append a new instance built from `descriptor` and select it.
    pub fn add_component(&mut self, descriptor: &Descriptor) -> String {
        let id = self.push_instance(descriptor);
        self.selected = Some(id.clone());
        id
    }

    /// Shallow-merge `partial_props` into the instance's props.
    /// Unknown ids are ignored.
    pub fn update_component(&mut self, id: &str, partial_props: &Value) {
        let Some(instance) = self.components.iter_mut().find(|c| c.id == id) else {
            debug!(%id, "document: update for unknown component ignored");
            return;
        };
        shallow_merge(&mut instance.props, partial_props);
    }

    /// Set the selection. An id that is not in the sequence clears it.
    pub fn select_component(&mut self, id: Option<&str>) {
        self.selected = id.filter(|id| self.get(id).is_some()).map(str::to_string);
    }

    /// Remove the instance with `id`. Returns whether anything was removed.
    pub fn delete_component(&mut self, id: &str) -> bool {
        let before = self.components.len();
        self.components.retain(|c| c.id != id);
        let removed = self.components.len() != before;
        if self.selected.as_deref() == Some(id) {
            self.selected = None;
        }
        removed
    }

    /// Swap the instance with its neighbour. Returns whether the order changed.
    pub fn move_component(&mut self, id: &str, direction: Direction) -> bool {
        let Some(index) = self.components.iter().position(|c| c.id == id) else {
            return false;
        };
        let target = match direction {
            Direction::Up => index.checked_sub(1),
            Direction::Down => Some(index + 1).filter(|&i| i < self.components.len()),
        };
        let Some(target) = target else {
            return false;
        };
        self.components.swap(index, target);
        true
    }

    /// Register every descriptor with `registry`, then append one instance
    /// per descriptor whether or not its compile succeeded. Failed types
    /// render through the diagnostic fallback.
    pub fn add_generated_components(
        &mut self,
        registry: &mut DynamicRegistry,
        descriptors: &[Descriptor],
    ) -> GeneratedBatch {
        let registrations = registry.register_all(descriptors);
        let instance_ids = descriptors.iter().map(|d| self.push_instance(d)).collect();
        GeneratedBatch { instance_ids, registrations }
    }

    /// Same as `add_generated_components` for descriptors compiled ahead of
    /// time with `registry::compile_all`.
    pub fn add_compiled_components(
        &mut self,
        registry: &mut DynamicRegistry,
        compiled: Vec<CompiledDescriptor>,
    ) -> GeneratedBatch {
        let mut batch = GeneratedBatch::default();
        for entry in compiled {
            batch.instance_ids.push(self.push_instance(entry.descriptor()));
            batch.registrations.push(registry.insert_compiled(entry));
        }
        batch
    }

    /// Whether `type_id` can be placed. Dynamic types are checked against
    /// the registry. The store has no view of the built-in library, so every
    /// other type is reported available and left to the dispatcher's
    /// fallback tiers.
    #[must_use]
    #[allow(clippy::unused_self)]
    pub fn is_component_available(&self, registry: &DynamicRegistry, type_id: &str) -> bool {
        if registry.is_dynamic_component(type_id) {
            return true;
        }
        // Static availability is not tracked.
        true
    }

    fn push_instance(&mut self, descriptor: &Descriptor) -> String {
        let id = self.fresh_id();
        let props = if descriptor.props.is_object() {
            descriptor.props.clone()
        } else {
            Value::Object(serde_json::Map::new())
        };
        self.components.push(ComponentInstance {
            id: id.clone(),
            type_id: descriptor.type_id.clone(),
            category: descriptor.category.clone(),
            props,
            position: Position::default(),
        });
        id
    }

    fn fresh_id(&self) -> String {
        loop {
            let id = generate_component_id();
            if self.get(&id).is_none() {
                return id;
            }
        }
    }
}

/// `component-<unix millis>-<random suffix>`.
fn generate_component_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis());
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(ID_SUFFIX_LEN)
        .map(char::from)
        .collect::<String>()
        .to_lowercase();
    format!("component-{millis}-{suffix}")
}

#[cfg(test)]
#[path = "document_test.rs"]
mod tests;
