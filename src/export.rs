//! Code export — a textual view of the document.
//!
//! Each instance exports as a self-closing tag named by its canonical
//! implementation name: strings as quoted attributes, everything else as
//! `{json}` expressions. Dynamic types with known source export that
//! source instead, so the generated component can be copied verbatim.

use serde_json::{Map, Value};

use crate::dispatch::TypeResolver;
use crate::document::{ComponentInstance, DocumentStore};
use crate::registry::DynamicRegistry;

/// `<Type prop="value" obj={json} />` for one instance.
#[must_use]
pub fn to_tag(instance: &ComponentInstance, resolver: &TypeResolver) -> String {
    let name = resolver.canonical_name(&instance.type_id);
    let mut out = format!("<{name}");
    let mut spread = Map::new();

    if let Some(props) = instance.props.as_object() {
        for (key, value) in props {
            if !is_attr_name(key) {
                spread.insert(key.clone(), value.clone());
                continue;
            }
            out.push(' ');
            out.push_str(key);
            out.push('=');
            out.push_str(&attr_value(value));
        }
    }
    if !spread.is_empty() {
        out.push_str(" {...");
        out.push_str(&Value::Object(spread).to_string());
        out.push('}');
    }
    out.push_str(" />");
    out
}

/// Source for dynamic types that have it, otherwise the tag.
#[must_use]
pub fn export_instance(instance: &ComponentInstance, resolver: &TypeResolver, registry: &DynamicRegistry) -> String {
    match registry.source_code(&instance.type_id) {
        Some(source) if !source.trim().is_empty() => source.to_string(),
        _ => to_tag(instance, resolver),
    }
}

/// Every instance in document order, separated by blank lines.
#[must_use]
pub fn export_document(store: &DocumentStore, resolver: &TypeResolver, registry: &DynamicRegistry) -> String {
    store
        .components()
        .iter()
        .map(|instance| export_instance(instance, resolver, registry))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn attr_value(value: &Value) -> String {
    match value {
        Value::String(s) if !s.contains(['"', '\n', '{', '}']) => format!("\"{s}\""),
        other => format!("{{{other}}}"),
    }
}

fn is_attr_name(key: &str) -> bool {
    let mut chars = key.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
