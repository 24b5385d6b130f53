//! Property editor — schema-free recursive editing of instance props.
//!
//! DESIGN
//! ======
//! There is no declared schema language. The instance's default or sample
//! props stand in for one: the editor walks `(value, schema)` pairs by
//! structural recursion, driven by `props::classify`.
//!
//! - object: one child per key present in the schema value
//! - array: one child per element of the current value, each checked
//!   against `schema[0]`; supports remove-at and append (clone of
//!   `schema[0]`)
//! - primitive: one bound control; number controls parse their input,
//!   every other control passes the raw text through
//!
//! Every edit produces a full replacement of the top-level props object,
//! which the caller hands to `DocumentStore::update_component`.
//!
//! SHAPE POLICY
//! ============
//! A missing value (`null`) under a structural schema node is treated as
//! an empty container of the schema's kind. Any other disagreement between
//! the runtime value, the schema, and the edit path is rejected with
//! `EditError::ShapeMismatch`; nothing is coerced and the document is left
//! untouched. The editor tree marks such nodes as `Mismatch`.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::builtins::BuiltinKind;
use crate::dispatch::TypeResolver;
use crate::document::ComponentInstance;
use crate::props::{PropKind, classify, display_text};
use crate::registry::DynamicRegistry;

// =============================================================================
// PATHS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Index(usize),
    Key(String),
}

/// Location of a field inside a props object, e.g. `$.links[0].label`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropPath(Vec<PathSegment>);

impl PropPath {
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn push_key(&self, key: &str) -> Self {
        let mut next = self.clone();
        next.0.push(PathSegment::Key(key.to_string()));
        next
    }

    #[must_use]
    pub fn push_index(&self, index: usize) -> Self {
        let mut next = self.clone();
        next.0.push(PathSegment::Index(index));
        next
    }

    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }
}

impl From<Vec<PathSegment>> for PropPath {
    fn from(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }
}

impl fmt::Display for PropPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("$")?;
        for segment in &self.0 {
            match segment {
                PathSegment::Key(key) => write!(f, ".{key}")?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

// =============================================================================
// EDITOR TREE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Control {
    Text,
    Number,
    Checkbox,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "node", rename_all = "lowercase")]
pub enum FieldNode {
    Primitive { path: PropPath, label: String, control: Control, value: String },
    Object { path: PropPath, label: String, fields: Vec<FieldNode> },
    Array { path: PropPath, label: String, items: Vec<FieldNode>, can_append: bool },
    Mismatch { path: PropPath, label: String, expected: PropKind, found: PropKind },
}

#[cfg(test)]
impl FieldNode {
    #[must_use]
    pub fn path(&self) -> &PropPath {
        match self {
            Self::Primitive { path, .. }
            | Self::Object { path, .. }
            | Self::Array { path, .. }
            | Self::Mismatch { path, .. } => path,
        }
    }
}

/// Build the editor tree for a props object against its schema.
#[must_use]
pub fn build_editor(value: &Value, schema: &Value) -> FieldNode {
    build_node(value, schema, &PropPath::root(), "props")
}

fn build_node(value: &Value, schema: &Value, path: &PropPath, label: &str) -> FieldNode {
    let expected = classify(schema);
    let found = classify(value);
    let label = label.to_string();

    match expected {
        PropKind::Object => {
            let Some(value_map) = container_object(value) else {
                return FieldNode::Mismatch { path: path.clone(), label, expected, found };
            };
            let fields = schema
                .as_object()
                .into_iter()
                .flatten()
                .map(|(key, child_schema)| {
                    let child = value_map.get(key).unwrap_or(&Value::Null);
                    build_node(child, child_schema, &path.push_key(key), key)
                })
                .collect();
            FieldNode::Object { path: path.clone(), label, fields }
        }
        PropKind::Array => {
            let Some(items) = container_array(value) else {
                return FieldNode::Mismatch { path: path.clone(), label, expected, found };
            };
            let template = schema.get(0);
            let items = items
                .iter()
                .enumerate()
                .map(|(index, item)| {
                    build_node(item, template.unwrap_or(item), &path.push_index(index), &format!("[{index}]"))
                })
                .collect();
            FieldNode::Array { path: path.clone(), label, items, can_append: template.is_some() }
        }
        PropKind::String | PropKind::Number | PropKind::Boolean => {
            if found.is_structural() {
                return FieldNode::Mismatch { path: path.clone(), label, expected, found };
            }
            FieldNode::Primitive { path: path.clone(), label, control: control_for(expected), value: display_text(value) }
        }
    }
}

fn control_for(kind: PropKind) -> Control {
    match kind {
        PropKind::Number => Control::Number,
        PropKind::Boolean => Control::Checkbox,
        _ => Control::Text,
    }
}

// =============================================================================
// EDITS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum EditOp {
    /// Raw text from a primitive control.
    Input(String),
    /// New state of a checkbox control.
    Toggle(bool),
    RemoveAt(usize),
    Append,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    #[error("shape mismatch at {path}: expected {expected:?}, found {found:?}")]
    ShapeMismatch { path: String, expected: PropKind, found: PropKind },
    #[error("no schema entry at {path}")]
    UnknownField { path: String },
    #[error("invalid number at {path}: {input:?}")]
    InvalidNumber { path: String, input: String },
    #[error("index {index} out of bounds at {path}")]
    IndexOutOfBounds { path: String, index: usize },
    #[error("array at {path} has no template element to append")]
    MissingTemplate { path: String },
}

impl crate::frame::ErrorCode for EditError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::ShapeMismatch { .. } => "E_SHAPE_MISMATCH",
            Self::UnknownField { .. } => "E_UNKNOWN_FIELD",
            Self::InvalidNumber { .. } => "E_INVALID_NUMBER",
            Self::IndexOutOfBounds { .. } => "E_INDEX_OUT_OF_BOUNDS",
            Self::MissingTemplate { .. } => "E_MISSING_TEMPLATE",
        }
    }
}

/// Apply `op` at `path` and return the full replacement props object.
///
/// # Errors
///
/// Returns an `EditError` when the path, value, and schema disagree, or the
/// input cannot be parsed for its control.
pub fn apply_edit(props: &Value, schema: &Value, path: &PropPath, op: &EditOp) -> Result<Value, EditError> {
    let root = PropPath::root();
    if container_object(props).is_none() || !schema.is_object() {
        return Err(mismatch(&root, PropKind::Object, props, schema));
    }
    apply_at(props, schema, path.segments(), &root, op)
}

fn apply_at(
    value: &Value,
    schema: &Value,
    rest: &[PathSegment],
    at: &PropPath,
    op: &EditOp,
) -> Result<Value, EditError> {
    let Some((segment, rest)) = rest.split_first() else {
        return apply_op(value, schema, at, op);
    };

    match segment {
        PathSegment::Key(key) => {
            let (Some(map), Some(schema_map)) = (container_object(value), schema.as_object()) else {
                return Err(mismatch(at, PropKind::Object, value, schema));
            };
            let child_at = at.push_key(key);
            let Some(child_schema) = schema_map.get(key) else {
                return Err(EditError::UnknownField { path: child_at.to_string() });
            };
            let child = map.get(key).unwrap_or(&Value::Null);
            let updated = apply_at(child, child_schema, rest, &child_at, op)?;
            let mut next = map;
            next.insert(key.clone(), updated);
            Ok(Value::Object(next))
        }
        PathSegment::Index(index) => {
            let (Some(items), true) = (container_array(value), schema.is_array()) else {
                return Err(mismatch(at, PropKind::Array, value, schema));
            };
            let Some(item) = items.get(*index) else {
                return Err(EditError::IndexOutOfBounds { path: at.to_string(), index: *index });
            };
            let template = schema.get(0).unwrap_or(item);
            let updated = apply_at(item, template, rest, &at.push_index(*index), op)?;
            let mut next = items;
            next[*index] = updated;
            Ok(Value::Array(next))
        }
    }
}

fn apply_op(value: &Value, schema: &Value, at: &PropPath, op: &EditOp) -> Result<Value, EditError> {
    match op {
        EditOp::Input(text) => match classify(schema) {
            PropKind::Number if !classify(value).is_structural() => parse_number(text, at),
            PropKind::String if !classify(value).is_structural() => Ok(Value::String(text.clone())),
            PropKind::Boolean if !classify(value).is_structural() => Ok(Value::String(text.clone())),
            expected => Err(mismatch(at, expected, value, schema)),
        },
        EditOp::Toggle(checked) => match classify(schema) {
            PropKind::Boolean if !classify(value).is_structural() => Ok(Value::Bool(*checked)),
            expected => Err(mismatch(at, expected, value, schema)),
        },
        EditOp::RemoveAt(index) => {
            let (Some(items), true) = (container_array(value), schema.is_array()) else {
                return Err(mismatch(at, PropKind::Array, value, schema));
            };
            if *index >= items.len() {
                return Err(EditError::IndexOutOfBounds { path: at.to_string(), index: *index });
            }
            Ok(Value::Array(
                items
                    .into_iter()
                    .enumerate()
                    .filter(|(i, _)| i != index)
                    .map(|(_, item)| item)
                    .collect(),
            ))
        }
        EditOp::Append => {
            let (Some(mut items), true) = (container_array(value), schema.is_array()) else {
                return Err(mismatch(at, PropKind::Array, value, schema));
            };
            let Some(template) = schema.get(0) else {
                return Err(EditError::MissingTemplate { path: at.to_string() });
            };
            items.push(template.clone());
            Ok(Value::Array(items))
        }
    }
}

fn parse_number(text: &str, at: &PropPath) -> Result<Value, EditError> {
    let invalid = || EditError::InvalidNumber { path: at.to_string(), input: text.to_string() };
    let trimmed = text.trim();
    if let Ok(n) = trimmed.parse::<i64>() {
        return Ok(Value::from(n));
    }
    let n = trimmed.parse::<f64>().map_err(|_| invalid())?;
    serde_json::Number::from_f64(n)
        .map(Value::Number)
        .ok_or_else(invalid)
}

/// Object view of `value`; `null` reads as an empty object.
fn container_object(value: &Value) -> Option<Map<String, Value>> {
    match value {
        Value::Object(map) => Some(map.clone()),
        Value::Null => Some(Map::new()),
        _ => None,
    }
}

/// Array view of `value`; `null` reads as an empty array.
fn container_array(value: &Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items.clone()),
        Value::Null => Some(Vec::new()),
        _ => None,
    }
}

fn mismatch(at: &PropPath, expected: PropKind, value: &Value, schema: &Value) -> EditError {
    let found = if classify(schema) == expected { classify(value) } else { classify(schema) };
    EditError::ShapeMismatch { path: at.to_string(), expected, found }
}

// =============================================================================
// SCHEMA SOURCE
// =============================================================================

/// Structural stand-in schema for an instance: registered sample data for
/// dynamic types, built-in defaults for static types, otherwise the
/// instance's own props.
#[must_use]
pub fn schema_for(instance: &ComponentInstance, resolver: &TypeResolver, registry: &DynamicRegistry) -> Value {
    if registry.is_dynamic_component(&instance.type_id) {
        if let Some(sample) = registry.get_dynamic_component_sample_data(&instance.type_id) {
            return sample.clone();
        }
        return instance.props.clone();
    }
    resolver
        .lookup_static(&instance.type_id)
        .map_or_else(|| instance.props.clone(), BuiltinKind::default_props)
}

#[cfg(test)]
#[path = "editor_test.rs"]
mod tests;
