//! Type resolution — dynamic first, static second, fallback last.
//!
//! DESIGN
//! ======
//! A `TypeResolver` is built once at startup. It owns the special-case
//! table (type ids whose implementation name the mechanical kebab →
//! PascalCase transform would get wrong) and an index from every known
//! built-in type id to its `BuiltinKind`, so library ids never re-run the
//! transform. Unknown ids still go through the transform so that
//! differently cased ids (`Hero-Section`) reach the same built-in.
//!
//! Lookup order for a raw type id:
//! 1. Dynamic registry by raw id. A compiled entry wins over any built-in;
//!    a failed entry resolves to the diagnostic fallback and stops there.
//! 2. Static registry by canonical name.
//! 3. Generic fallback carrying the raw id.
//!
//! Resolution reads the registry and never mutates anything, so the same
//! id against the same registry always yields the same renderer.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::builtins::BuiltinKind;
use crate::document::{ComponentInstance, DocumentStore};
use crate::registry::sandbox::Factory;
use crate::registry::{DynamicRegistry, RegistryEntry};
use crate::render::{RenderNode, diagnostic_fallback, generic_fallback};

/// Type ids whose implementation name is not the mechanical transform.
pub const SPECIAL_CASES: &[(&str, &str)] = &[
    ("ao-message-signer", "AOMessageSigner"),
    ("cta-section", "CTASection"),
    ("nft-gallery", "NFTGallery"),
    ("nav-bar", "Navbar"),
];

// =============================================================================
// NORMALIZATION
// =============================================================================

/// `hero-section` → `HeroSection`. Empty segments are dropped.
#[must_use]
pub fn to_pascal_case(raw: &str) -> String {
    raw.split('-')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let mut chars = segment.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect::<String>()
            })
        })
        .collect()
}

// =============================================================================
// RESOLUTION RESULT
// =============================================================================

/// Which tier produced a renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Dynamic,
    Static,
    Diagnostic,
    Fallback,
}

#[derive(Debug, Clone)]
pub enum Resolved {
    Dynamic { type_id: String, factory: Arc<Factory> },
    Static(BuiltinKind),
    Diagnostic { type_id: String, error: Option<String> },
    Fallback { type_id: String },
}

/// Renderer identity: dynamic renderers compare by factory pointer.
impl PartialEq for Resolved {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Dynamic { type_id: a, factory: fa }, Self::Dynamic { type_id: b, factory: fb }) => {
                a == b && Arc::ptr_eq(fa, fb)
            }
            (Self::Static(a), Self::Static(b)) => a == b,
            (Self::Diagnostic { type_id: a, error: ea }, Self::Diagnostic { type_id: b, error: eb }) => {
                a == b && ea == eb
            }
            (Self::Fallback { type_id: a }, Self::Fallback { type_id: b }) => a == b,
            _ => false,
        }
    }
}

impl Resolved {
    #[must_use]
    pub fn tier(&self) -> Tier {
        match self {
            Self::Dynamic { .. } => Tier::Dynamic,
            Self::Static(_) => Tier::Static,
            Self::Diagnostic { .. } => Tier::Diagnostic,
            Self::Fallback { .. } => Tier::Fallback,
        }
    }

    /// Render `props`. Never fails: a dynamic renderer that errors at
    /// invocation time renders the diagnostic fallback instead.
    #[must_use]
    pub fn render(&self, props: &Value) -> RenderNode {
        match self {
            Self::Dynamic { type_id, factory } => factory.render(props).unwrap_or_else(|e| {
                warn!(%type_id, error = %e, "dispatch: dynamic render failed");
                diagnostic_fallback(type_id, Some(&e.to_string()))
            }),
            Self::Static(kind) => kind.render(props),
            Self::Diagnostic { type_id, error } => diagnostic_fallback(type_id, error.as_deref()),
            Self::Fallback { type_id } => generic_fallback(type_id),
        }
    }
}

/// One rendered instance of a document.
#[derive(Debug, Clone, Serialize)]
pub struct RenderedInstance {
    pub id: String,
    #[serde(rename = "type")]
    pub type_id: String,
    pub tier: Tier,
    pub node: RenderNode,
}

// =============================================================================
// RESOLVER
// =============================================================================

#[derive(Debug, Clone)]
pub struct TypeResolver {
    special_cases: HashMap<String, String>,
    by_name: HashMap<&'static str, BuiltinKind>,
    by_type_id: HashMap<String, BuiltinKind>,
}

impl Default for TypeResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeResolver {
    #[must_use]
    pub fn new() -> Self {
        let special_cases: HashMap<String, String> = SPECIAL_CASES
            .iter()
            .map(|(raw, name)| ((*raw).to_string(), (*name).to_string()))
            .collect();
        let by_name: HashMap<&'static str, BuiltinKind> = BuiltinKind::ALL
            .iter()
            .map(|kind| (kind.canonical_name(), *kind))
            .collect();

        let mut by_type_id = HashMap::new();
        for kind in BuiltinKind::ALL {
            let canonical = special_cases
                .get(kind.type_id())
                .cloned()
                .unwrap_or_else(|| to_pascal_case(kind.type_id()));
            if let Some(found) = by_name.get(canonical.as_str()) {
                by_type_id.insert(kind.type_id().to_string(), *found);
            }
        }
        for (raw, name) in &special_cases {
            if let Some(found) = by_name.get(name.as_str()) {
                by_type_id.insert(raw.clone(), *found);
            }
        }

        Self { special_cases, by_name, by_type_id }
    }

    /// Canonical implementation name for a raw type id.
    #[must_use]
    pub fn canonical_name(&self, type_id: &str) -> String {
        self.special_cases
            .get(type_id)
            .cloned()
            .unwrap_or_else(|| to_pascal_case(type_id))
    }

    /// Built-in for a raw type id, if any.
    #[must_use]
    pub fn lookup_static(&self, type_id: &str) -> Option<BuiltinKind> {
        if let Some(kind) = self.by_type_id.get(type_id) {
            return Some(*kind);
        }
        self.by_name
            .get(self.canonical_name(type_id).as_str())
            .copied()
    }

    #[must_use]
    pub fn resolve(&self, type_id: &str, registry: &DynamicRegistry) -> Resolved {
        match registry.entry(type_id) {
            Some(RegistryEntry::Compiled { factory, .. }) => {
                Resolved::Dynamic { type_id: type_id.to_string(), factory: Arc::clone(factory) }
            }
            Some(RegistryEntry::Failed { error, .. }) => {
                Resolved::Diagnostic { type_id: type_id.to_string(), error: Some(error.clone()) }
            }
            None => match self.lookup_static(type_id) {
                Some(kind) => Resolved::Static(kind),
                None => Resolved::Fallback { type_id: type_id.to_string() },
            },
        }
    }

    #[must_use]
    pub fn render_instance(&self, instance: &ComponentInstance, registry: &DynamicRegistry) -> RenderedInstance {
        let resolved = self.resolve(&instance.type_id, registry);
        RenderedInstance {
            id: instance.id.clone(),
            type_id: instance.type_id.clone(),
            tier: resolved.tier(),
            node: resolved.render(&instance.props),
        }
    }

    /// Render every instance in document order. Each instance resolves and
    /// renders on its own; a broken type only affects its own instances.
    #[must_use]
    pub fn render_document(&self, store: &DocumentStore, registry: &DynamicRegistry) -> Vec<RenderedInstance> {
        store
            .components()
            .iter()
            .map(|instance| self.render_instance(instance, registry))
            .collect()
    }
}

#[cfg(test)]
#[path = "dispatch_test.rs"]
mod tests;
