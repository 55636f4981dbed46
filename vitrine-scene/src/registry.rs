use serde::{Deserialize, Serialize};

/// Kind of value a prop accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropKind {
    Text,
    Number,
    Bool,
}

impl PropKind {
    pub fn name(&self) -> &'static str {
        match self {
            PropKind::Text => "text",
            PropKind::Number => "number",
            PropKind::Bool => "bool",
        }
    }
}

/// A prop definition in an element spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropDef {
    pub name: String,
    pub kind: PropKind,
    #[serde(default)]
    pub required: bool,
}

impl PropDef {
    pub fn optional(name: &str, kind: PropKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: false,
        }
    }
}

/// Declares one allow-listed element: its lowercase tag, the props it
/// accepts, and whether it takes children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementSpec {
    pub tag: String,
    #[serde(default)]
    pub props: Vec<PropDef>,
    #[serde(default)]
    pub children: bool,
}

impl ElementSpec {
    pub fn prop(&self, name: &str) -> Option<&PropDef> {
        self.props.iter().find(|p| p.name == name)
    }
}

/// Props accepted by every element regardless of its spec.
pub const UNIVERSAL_PROPS: &[(&str, PropKind)] = &[
    ("id", PropKind::Text),
    ("color", PropKind::Text),
    ("background", PropKind::Text),
];

/// The allow-list of elements evaluated code may construct.
///
/// Which elements are exposed is a product decision, not an engineering
/// invariant: the registry is plain configuration, and the default set is
/// deliberately minimal.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementRegistry {
    specs: Vec<ElementSpec>,
}

impl ElementRegistry {
    pub fn new(specs: Vec<ElementSpec>) -> Self {
        Self { specs }
    }

    pub fn get(&self, tag: &str) -> Option<&ElementSpec> {
        self.specs.iter().find(|s| s.tag == tag)
    }

    pub fn is_allowed(&self, tag: &str) -> bool {
        self.get(tag).is_some()
    }

    pub fn specs(&self) -> &[ElementSpec] {
        &self.specs
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.specs.iter().map(|s| s.tag.as_str())
    }

    /// True when `name` is a universal prop or declared by the element's spec.
    pub fn prop_kind(&self, tag: &str, name: &str) -> Option<PropKind> {
        if let Some((_, kind)) = UNIVERSAL_PROPS.iter().find(|(n, _)| *n == name) {
            return Some(*kind);
        }
        self.get(tag).and_then(|s| s.prop(name)).map(|p| p.kind)
    }
}

impl Default for ElementRegistry {
    fn default() -> Self {
        Self::new(vec![
            ElementSpec {
                tag: "stack".to_string(),
                props: vec![
                    PropDef::optional("gap", PropKind::Number),
                    PropDef::optional("padding", PropKind::Number),
                ],
                children: true,
            },
            ElementSpec {
                tag: "text".to_string(),
                props: vec![],
                children: true,
            },
            ElementSpec {
                tag: "button".to_string(),
                props: vec![
                    PropDef::optional("label", PropKind::Text),
                    PropDef::optional("disabled", PropKind::Bool),
                ],
                children: true,
            },
            ElementSpec {
                tag: "input".to_string(),
                props: vec![
                    PropDef::optional("value", PropKind::Text),
                    PropDef::optional("placeholder", PropKind::Text),
                ],
                children: false,
            },
        ])
    }
}
