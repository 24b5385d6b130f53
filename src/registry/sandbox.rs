//! Sandboxed script engine for generated component source.
//!
//! DESIGN
//! ======
//! Generated components arrive as Rhai source defining `fn render(props)`.
//! Scripts run in an `Engine` with hard limits on operations, call depth,
//! expression depth, and collection sizes, with `eval` disabled and module
//! imports resolved by a dummy resolver, so a script can only compute a
//! value from its props. Props cross the boundary as JSON; the returned
//! `Dynamic` comes back as JSON and is converted into a `RenderNode`.
//!
//! Compilation has two failure points: parsing, and a trial render with
//! the descriptor's sample props. Both produce a `CompileError`.

use std::fmt;
use std::sync::Arc;

use rhai::module_resolvers::DummyModuleResolver;
use rhai::{AST, Array, Dynamic, Engine, ImmutableString, Map, Scope};
use serde_json::Value;
use tracing::debug;

use crate::render::{RenderError, RenderNode};

/// Name of the entry point every component script must define.
pub const RENDER_FN: &str = "render";

pub const DEFAULT_MAX_OPERATIONS: u64 = 100_000;
pub const DEFAULT_MAX_CALL_LEVELS: usize = 32;
pub const DEFAULT_MAX_STRING_SIZE: usize = 65_536;
const MAX_EXPR_DEPTH: usize = 64;
const MAX_FN_EXPR_DEPTH: usize = 32;
const MAX_COLLECTION_SIZE: usize = 10_000;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    #[error("component source is empty")]
    EmptySource,
    #[error("syntax error: {0}")]
    Parse(String),
    #[error("runtime error: {0}")]
    Runtime(String),
    #[error("props not representable in script: {0}")]
    Props(String),
    #[error("invalid render output: {0}")]
    Output(String),
}

impl From<RenderError> for CompileError {
    fn from(e: RenderError) -> Self {
        Self::Output(e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SandboxLimits {
    pub max_operations: u64,
    pub max_call_levels: usize,
    pub max_string_size: usize,
}

impl Default for SandboxLimits {
    fn default() -> Self {
        Self {
            max_operations: DEFAULT_MAX_OPERATIONS,
            max_call_levels: DEFAULT_MAX_CALL_LEVELS,
            max_string_size: DEFAULT_MAX_STRING_SIZE,
        }
    }
}

// =============================================================================
// SANDBOX
// =============================================================================

/// Shared, immutable script engine. Cheap to clone.
#[derive(Clone)]
pub struct Sandbox {
    engine: Arc<Engine>,
}

impl fmt::Debug for Sandbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sandbox").finish_non_exhaustive()
    }
}

impl Default for Sandbox {
    fn default() -> Self {
        Self::new(SandboxLimits::default())
    }
}

impl Sandbox {
    #[must_use]
    pub fn new(limits: SandboxLimits) -> Self {
        let mut engine = Engine::new();
        engine.set_max_operations(limits.max_operations);
        engine.set_max_call_levels(limits.max_call_levels);
        engine.set_max_expr_depths(MAX_EXPR_DEPTH, MAX_FN_EXPR_DEPTH);
        engine.set_max_string_size(limits.max_string_size);
        engine.set_max_array_size(MAX_COLLECTION_SIZE);
        engine.set_max_map_size(MAX_COLLECTION_SIZE);
        engine.set_module_resolver(DummyModuleResolver::new());
        engine.disable_symbol("eval");
        engine.on_print(|text| debug!(text, "sandbox: print"));
        engine.on_debug(|text, source, pos| debug!(text, ?source, %pos, "sandbox: debug"));

        engine.register_fn("el", |tag: ImmutableString, children: Array| element(tag, Map::new(), children));
        engine.register_fn("el", |tag: ImmutableString, attrs: Map, children: Array| element(tag, attrs, children));

        Self { engine: Arc::new(engine) }
    }

    /// Parse `source` and prove it renders `sample_props`.
    ///
    /// # Errors
    ///
    /// Returns a `CompileError` if the source is empty, fails to parse,
    /// or the trial render fails.
    pub fn compile(&self, source: &str, sample_props: &Value) -> Result<Factory, CompileError> {
        if source.trim().is_empty() {
            return Err(CompileError::EmptySource);
        }
        let ast = self
            .engine
            .compile(source)
            .map_err(|e| CompileError::Parse(e.to_string()))?;
        let factory = Factory { engine: Arc::clone(&self.engine), ast: Arc::new(ast) };
        factory.render(sample_props)?;
        Ok(factory)
    }
}

fn element(tag: ImmutableString, attrs: Map, children: Array) -> Map {
    let mut node = Map::new();
    node.insert("tag".into(), Dynamic::from(tag));
    node.insert("attrs".into(), Dynamic::from_map(attrs));
    node.insert("children".into(), Dynamic::from_array(children));
    node
}

// =============================================================================
// FACTORY
// =============================================================================

/// A compiled component: `props -> RenderNode`.
pub struct Factory {
    engine: Arc<Engine>,
    ast: Arc<AST>,
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factory").finish_non_exhaustive()
    }
}

impl Factory {
    /// Invoke the script's `render` function.
    ///
    /// # Errors
    ///
    /// Returns `Runtime` for script errors (including exceeded limits),
    /// `Props`/`Output` when values cannot cross the boundary.
    pub fn render(&self, props: &Value) -> Result<RenderNode, CompileError> {
        let input = serde_json::from_value::<Dynamic>(props.clone()).map_err(|e| CompileError::Props(e.to_string()))?;
        let mut scope = Scope::new();
        let result = self
            .engine
            .call_fn::<Dynamic>(&mut scope, &self.ast, RENDER_FN, (input,))
            .map_err(|e| CompileError::Runtime(e.to_string()))?;
        let output = serde_json::to_value(&result).map_err(|e| CompileError::Output(e.to_string()))?;
        Ok(RenderNode::from_value(&output)?)
    }
}

#[cfg(test)]
#[path = "sandbox_test.rs"]
mod tests;
