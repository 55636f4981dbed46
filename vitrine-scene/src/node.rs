use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A prop value carried by an element node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl PropValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            PropValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Name of the value's kind, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            PropValue::Bool(_) => "bool",
            PropValue::Number(_) => "number",
            PropValue::Text(_) => "text",
        }
    }
}

/// A child of an element: either a nested element or a run of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Child {
    Element(Node),
    Text(String),
}

/// One node of a mounted element tree.
///
/// Props are kept sorted (BTreeMap) so serialized trees are stable and
/// comparable in tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub tag: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub props: BTreeMap<String, PropValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Child>,
}

impl Node {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            props: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn with_prop(mut self, name: impl Into<String>, value: PropValue) -> Self {
        self.props.insert(name.into(), value);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Child::Text(text.into()));
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(Child::Element(child));
        self
    }

    /// The element's `id` prop, when set to a text value.
    pub fn id(&self) -> Option<&str> {
        self.props.get("id").and_then(PropValue::as_str)
    }

    pub fn prop_str(&self, name: &str) -> Option<&str> {
        self.props.get(name).and_then(PropValue::as_str)
    }

    pub fn prop_number(&self, name: &str) -> Option<f64> {
        self.props.get(name).and_then(PropValue::as_number)
    }

    pub fn prop_bool(&self, name: &str) -> Option<bool> {
        self.props.get(name).and_then(PropValue::as_bool)
    }

    /// Concatenated text of all direct text children.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            if let Child::Text(t) = child {
                if !out.is_empty() {
                    out.push(' ');
                }
                out.push_str(t);
            }
        }
        out
    }

    /// Direct element children (text runs skipped).
    pub fn child_elements(&self) -> impl Iterator<Item = &Node> {
        self.children.iter().filter_map(|c| match c {
            Child::Element(n) => Some(n),
            Child::Text(_) => None,
        })
    }
}
