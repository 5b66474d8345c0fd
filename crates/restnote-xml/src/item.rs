//! XPath result items.

use serde_json::Value;

use crate::document::{Document, NodeId, NodeKind};

/// One value produced by an XPath evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    /// An element (or the document node)
    Element(NodeId),
    /// A text or comment node, materialized
    Text(String),
    /// An attribute, materialized
    Attribute {
        /// Attribute name as written
        name: String,
        /// Attribute value
        value: String,
    },
    /// A string result (`string(...)`, `name()`, ...)
    String(String),
    /// A numeric result (`count(...)`, ...)
    Number(f64),
    /// A boolean result (`not(...)`, comparisons)
    Boolean(bool),
}

impl Item {
    /// The element id when this item is an element.
    pub fn as_element(&self) -> Option<NodeId> {
        match self {
            Self::Element(id) => Some(*id),
            _ => None,
        }
    }

    /// XPath string-value of the item.
    pub fn string_value(&self, doc: &Document) -> String {
        match self {
            Self::Element(id) => doc.string_value(*id),
            Self::Text(s) | Self::String(s) => s.clone(),
            Self::Attribute { value, .. } => value.clone(),
            Self::Number(n) => format_number(*n),
            Self::Boolean(b) => b.to_string(),
        }
    }

    /// A short human readable rendering used in traces.
    pub fn describe(&self, doc: &Document) -> String {
        match self {
            Self::Element(id) => match doc.kind(*id) {
                Some(NodeKind::Element(_)) => {
                    let name = doc.name(*id).map(|n| n.qualified()).unwrap_or_default();
                    format!("<Element {name}>")
                }
                Some(_) => "<Document>".to_string(),
                None => format!("<Detached {id}>"),
            },
            Self::Attribute { name, value } => format!("{name}=\"{value}\""),
            other => other.string_value(doc),
        }
    }

    /// JSON rendering used for pretty-printed trace payloads.
    pub fn to_json(&self, doc: &Document) -> Value {
        match self {
            Self::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(format_number(*n))),
            Self::Boolean(b) => Value::Bool(*b),
            Self::Element(_) | Self::Attribute { .. } => Value::String(self.describe(doc)),
            Self::Text(s) | Self::String(s) => Value::String(s.clone()),
        }
    }
}

/// Format a number the way XPath `string()` does.
pub(crate) fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}
