//! Property value model — tagged-variant view over JSON-shaped props.
//!
//! DESIGN
//! ======
//! Props carry no declared type. Every consumer (editor, export, drop
//! seeding) classifies a `serde_json::Value` into one of five kinds and
//! walks it by structural recursion. `null` is editable as a string.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Shape of a props value as seen by the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropKind {
    String,
    Number,
    Boolean,
    Array,
    Object,
}

impl PropKind {
    #[must_use]
    pub fn is_structural(self) -> bool {
        matches!(self, Self::Array | Self::Object)
    }
}

/// Classify a value. Ordered lists are arrays, maps are objects, and
/// everything else (including `null`) is a primitive.
#[must_use]
pub fn classify(value: &Value) -> PropKind {
    match value {
        Value::Array(_) => PropKind::Array,
        Value::Object(_) => PropKind::Object,
        Value::Number(_) => PropKind::Number,
        Value::Bool(_) => PropKind::Boolean,
        Value::String(_) | Value::Null => PropKind::String,
    }
}

/// Text shown in a primitive control for `value`.
#[must_use]
pub fn display_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Shallow merge `partial` into `target`. Keys in `partial` replace, all
/// other keys are untouched. A non-object target is replaced by an empty
/// object first; a non-object partial is ignored.
pub fn shallow_merge(target: &mut Value, partial: &Value) {
    let Value::Object(updates) = partial else {
        return;
    };
    if !target.is_object() {
        *target = Value::Object(serde_json::Map::new());
    }
    if let Some(map) = target.as_object_mut() {
        for (key, value) in updates {
            map.insert(key.clone(), value.clone());
        }
    }
}

#[cfg(test)]
#[path = "props_test.rs"]
mod tests;
