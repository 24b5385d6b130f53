//! Render tree — the output of every renderer tier.
//!
//! DESIGN
//! ======
//! Static, dynamic, and fallback renderers all produce a `RenderNode`.
//! Dynamic renderers hand back loosely shaped JSON, so conversion from
//! `serde_json::Value` is lenient about leaves (numbers and booleans become
//! text) but strict about elements (an object must carry a string `tag`).
//! Fallback renderers are total: they build from their inputs only and
//! cannot fail.
//!
//! MARKUP SAFETY
//! =============
//! Dynamic trees come from generated scripts, so conversion rejects any tag
//! outside `ALLOWED_TAGS` and drops event-handler attributes and
//! script-scheme URLs. `to_html` applies the same rules again to every
//! tree, static ones included, before anything reaches a client.

use std::collections::BTreeMap;
use std::fmt::Write;

use serde::Serialize;
use serde_json::Value;

use crate::props::display_text;

/// CSS class carried by the generic (unresolved type) placeholder.
pub const FALLBACK_CLASS: &str = "composer-fallback";

/// CSS class carried by the diagnostic (compile error) placeholder.
pub const DIAGNOSTIC_CLASS: &str = "composer-diagnostic";

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RenderNode {
    Text {
        text: String,
    },
    Element {
        tag: String,
        attrs: BTreeMap<String, String>,
        children: Vec<RenderNode>,
    },
    Fragment {
        children: Vec<RenderNode>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("render tree node at {path} has no string `tag`")]
    MissingTag { path: String },
    #[error("render tree nested deeper than {0} levels")]
    TooDeep(usize),
    #[error("render tree node at {path} uses disallowed tag `{tag}`")]
    DisallowedTag { path: String, tag: String },
}

const MAX_TREE_DEPTH: usize = 64;

/// Elements a renderer may emit. Anything else is rejected on conversion
/// and omitted from HTML output.
pub const ALLOWED_TAGS: &[&str] = &[
    "a", "article", "aside", "b", "blockquote", "br", "button", "code", "div", "em", "figcaption", "figure",
    "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "i", "img", "input", "label", "li", "main",
    "nav", "ol", "option", "p", "pre", "section", "select", "small", "span", "strong", "table", "tbody", "td",
    "textarea", "th", "thead", "tr", "u", "ul",
];

/// Attributes whose value is loaded or navigated to by the browser.
const URL_ATTRS: &[&str] = &["href", "src", "action", "formaction", "poster", "xlink:href"];

const BLOCKED_SCHEMES: &[&str] = &["javascript:", "vbscript:"];

// =============================================================================
// BUILDERS
// =============================================================================

impl RenderNode {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn element(tag: impl Into<String>) -> Self {
        Self::Element { tag: tag.into(), attrs: BTreeMap::new(), children: Vec::new() }
    }

    #[must_use]
    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let Self::Element { attrs, .. } = &mut self {
            attrs.insert(key.into(), value.into());
        }
        self
    }

    #[must_use]
    pub fn child(mut self, node: RenderNode) -> Self {
        match &mut self {
            Self::Element { children, .. } | Self::Fragment { children } => children.push(node),
            Self::Text { .. } => {}
        }
        self
    }

    #[must_use]
    pub fn children(mut self, nodes: impl IntoIterator<Item = RenderNode>) -> Self {
        for node in nodes {
            self = self.child(node);
        }
        self
    }

    /// Concatenated text content of this subtree.
    #[cfg(test)]
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    #[cfg(test)]
    fn collect_text(&self, out: &mut String) {
        match self {
            Self::Text { text } => out.push_str(text),
            Self::Element { children, .. } | Self::Fragment { children } => {
                for child in children {
                    child.collect_text(out);
                }
            }
        }
    }

    /// Value of an attribute on an element root.
    #[cfg(test)]
    #[must_use]
    pub fn attr_value(&self, key: &str) -> Option<&str> {
        match self {
            Self::Element { attrs, .. } => attrs.get(key).map(String::as_str),
            _ => None,
        }
    }
}

// =============================================================================
// CONVERSION
// =============================================================================

impl RenderNode {
    /// Convert renderer output into a tree.
    ///
    /// Accepted shapes: string/number/boolean (text), `null` (empty
    /// fragment), array (fragment), object `{tag, attrs?, children?}`.
    ///
    /// # Errors
    ///
    /// Returns `MissingTag` for objects without a string `tag` and
    /// `TooDeep` for trees nested past the depth limit.
    pub fn from_value(value: &Value) -> Result<Self, RenderError> {
        Self::from_value_at(value, "$", 0)
    }

    fn from_value_at(value: &Value, path: &str, depth: usize) -> Result<Self, RenderError> {
        if depth > MAX_TREE_DEPTH {
            return Err(RenderError::TooDeep(MAX_TREE_DEPTH));
        }
        match value {
            Value::Null => Ok(Self::Fragment { children: Vec::new() }),
            Value::String(s) => Ok(Self::text(s.clone())),
            Value::Number(_) | Value::Bool(_) => Ok(Self::text(value.to_string())),
            Value::Array(items) => {
                let children = items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| Self::from_value_at(item, &format!("{path}[{i}]"), depth + 1))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Self::Fragment { children })
            }
            Value::Object(map) => {
                let Some(tag) = map.get("tag").and_then(Value::as_str) else {
                    return Err(RenderError::MissingTag { path: path.to_string() });
                };
                if !is_allowed_tag(tag) {
                    return Err(RenderError::DisallowedTag { path: path.to_string(), tag: tag.to_string() });
                }
                let attrs = map
                    .get("attrs")
                    .and_then(Value::as_object)
                    .map(|attrs| {
                        attrs
                            .iter()
                            .map(|(k, v)| (k.clone(), display_text(v)))
                            .filter(|(k, v)| is_allowed_attr(k, v))
                            .collect::<BTreeMap<_, _>>()
                    })
                    .unwrap_or_default();
                let children = match map.get("children") {
                    None | Some(Value::Null) => Vec::new(),
                    Some(Value::Array(items)) => items
                        .iter()
                        .enumerate()
                        .map(|(i, item)| {
                            Self::from_value_at(item, &format!("{path}.children[{i}]"), depth + 1)
                        })
                        .collect::<Result<Vec<_>, _>>()?,
                    Some(single) => vec![Self::from_value_at(single, &format!("{path}.children"), depth + 1)?],
                };
                Ok(Self::Element { tag: tag.to_string(), attrs, children })
            }
        }
    }
}

// =============================================================================
// HTML
// =============================================================================

impl RenderNode {
    /// Serialize to escaped HTML. Elements outside `ALLOWED_TAGS` are
    /// omitted along with their subtree; unsafe attributes are dropped.
    #[must_use]
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        match self {
            Self::Text { text } => out.push_str(&escape_html(text)),
            Self::Fragment { children } => {
                for child in children {
                    child.write_html(out);
                }
            }
            Self::Element { tag, attrs, children } => {
                if !is_allowed_tag(tag) {
                    return;
                }
                out.push('<');
                out.push_str(tag);
                for (key, value) in attrs {
                    if is_allowed_attr(key, value) {
                        let _ = write!(out, " {key}=\"{}\"", escape_html(value));
                    }
                }
                out.push('>');
                for child in children {
                    child.write_html(out);
                }
                let _ = write!(out, "</{tag}>");
            }
        }
    }
}

fn is_allowed_tag(tag: &str) -> bool {
    ALLOWED_TAGS.contains(&tag)
}

fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == ':')
}

/// Plain attribute names only; no `on*` handlers, no script-scheme URLs.
fn is_allowed_attr(name: &str, value: &str) -> bool {
    if !is_safe_name(name) {
        return false;
    }
    let name = name.to_ascii_lowercase();
    if name.starts_with("on") {
        return false;
    }
    if URL_ATTRS.contains(&name.as_str()) {
        // Browsers ignore embedded whitespace and control characters in schemes.
        let scheme: String = value
            .chars()
            .filter(|c| !c.is_ascii_whitespace() && !c.is_control())
            .take(16)
            .collect::<String>()
            .to_ascii_lowercase();
        if BLOCKED_SCHEMES.iter().any(|blocked| scheme.starts_with(blocked)) {
            return false;
        }
    }
    true
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

// =============================================================================
// FALLBACKS
// =============================================================================

/// Placeholder for a type no tier could resolve. Always shows the raw type.
#[must_use]
pub fn generic_fallback(type_id: &str) -> RenderNode {
    RenderNode::element("div")
        .attr("class", FALLBACK_CLASS)
        .attr("data-type", type_id)
        .child(RenderNode::element("strong").child(RenderNode::text("Unknown component: ")))
        .child(RenderNode::element("code").child(RenderNode::text(type_id)))
}

/// Placeholder for a type whose dynamic entry failed to compile or render.
#[must_use]
pub fn diagnostic_fallback(type_id: &str, error: Option<&str>) -> RenderNode {
    let mut node = RenderNode::element("div")
        .attr("class", DIAGNOSTIC_CLASS)
        .attr("data-type", type_id)
        .child(RenderNode::element("strong").child(RenderNode::text("Component failed to load: ")))
        .child(RenderNode::element("code").child(RenderNode::text(type_id)));
    if let Some(error) = error {
        node = node.child(RenderNode::element("pre").child(RenderNode::text(error)));
    }
    node
}

#[cfg(test)]
#[path = "render_test.rs"]
mod tests;
