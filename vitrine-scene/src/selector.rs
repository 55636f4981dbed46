use crate::error::{SceneError, SceneResult};
use crate::node::{Child, Node};

/// A capture-target selector: `#id` or a bare element tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Id(String),
    Tag(String),
}

fn is_name(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

impl Selector {
    pub fn parse(selector: &str) -> SceneResult<Self> {
        let err = |reason: &str| SceneError::InvalidSelector {
            selector: selector.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = selector.trim();
        if trimmed.is_empty() {
            return Err(err("selector is empty"));
        }
        if let Some(id) = trimmed.strip_prefix('#') {
            if !is_name(id) {
                return Err(err("id must be alphanumeric, '-' or '_'"));
            }
            return Ok(Selector::Id(id.to_string()));
        }
        if !is_name(trimmed) {
            return Err(err("expected '#id' or an element tag"));
        }
        Ok(Selector::Tag(trimmed.to_ascii_lowercase()))
    }

    pub fn matches(&self, node: &Node) -> bool {
        match self {
            Selector::Id(id) => node.id() == Some(id.as_str()),
            Selector::Tag(tag) => node.tag == *tag,
        }
    }
}

/// Depth-first search for the first node matching the selector.
pub fn find<'a>(root: &'a Node, selector: &Selector) -> Option<&'a Node> {
    if selector.matches(root) {
        return Some(root);
    }
    for child in &root.children {
        if let Child::Element(node) = child {
            if let Some(found) = find(node, selector) {
                return Some(found);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::PropValue;

    fn tree() -> Node {
        Node::new("stack")
            .with_child(
                Node::new("button")
                    .with_prop("id", PropValue::Text("ok".into()))
                    .with_text("OK"),
            )
            .with_child(Node::new("input"))
    }

    #[test]
    fn finds_by_id_and_tag() {
        let root = tree();
        let sel = Selector::parse("#ok").unwrap();
        assert_eq!(find(&root, &sel).unwrap().tag, "button");

        let sel = Selector::parse("input").unwrap();
        assert_eq!(find(&root, &sel).unwrap().tag, "input");
    }

    #[test]
    fn miss_returns_none() {
        let root = tree();
        let sel = Selector::parse("#missing").unwrap();
        assert!(find(&root, &sel).is_none());
    }

    #[test]
    fn rejects_malformed_selectors() {
        assert!(Selector::parse("").is_err());
        assert!(Selector::parse("#").is_err());
        assert!(Selector::parse("a b").is_err());
    }
}
