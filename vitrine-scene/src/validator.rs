use crate::error::{SceneError, SceneResult};
use crate::node::{Child, Node, PropValue};
use crate::registry::{ElementRegistry, PropKind};
use crate::style::parse_hex_color;
use std::collections::HashSet;

/// Hard cap on element nesting. Evaluated code can build arbitrarily deep
/// (even cyclic) tables; conversion and validation both stop here.
pub const MAX_NESTING_DEPTH: usize = 16;

/// Validate a mounted tree against the allow-list registry.
pub fn validate(root: &Node, registry: &ElementRegistry) -> SceneResult<()> {
    let mut seen_ids = HashSet::new();
    validate_node(root, registry, 0, &mut seen_ids)
}

fn validate_node(
    node: &Node,
    registry: &ElementRegistry,
    depth: usize,
    seen_ids: &mut HashSet<String>,
) -> SceneResult<()> {
    if depth >= MAX_NESTING_DEPTH {
        return Err(SceneError::MaxNestingDepthExceeded {
            max_depth: MAX_NESTING_DEPTH,
        });
    }

    let spec = registry
        .get(&node.tag)
        .ok_or_else(|| SceneError::UnknownElement {
            tag: node.tag.clone(),
        })?;

    for (name, value) in &node.props {
        let kind = registry.prop_kind(&node.tag, name).ok_or_else(|| {
            SceneError::UnknownProp {
                element: node.tag.clone(),
                prop: name.clone(),
            }
        })?;
        check_kind(&node.tag, name, kind, value)?;
    }

    for def in &spec.props {
        if def.required && !node.props.contains_key(&def.name) {
            return Err(SceneError::MissingProp {
                element: node.tag.clone(),
                prop: def.name.clone(),
            });
        }
    }

    if let Some(id) = node.id() {
        if !seen_ids.insert(id.to_string()) {
            return Err(SceneError::DuplicateId { id: id.to_string() });
        }
    }

    if !spec.children && !node.children.is_empty() {
        return Err(SceneError::ChildrenNotAllowed {
            element: node.tag.clone(),
        });
    }

    for child in &node.children {
        if let Child::Element(n) = child {
            validate_node(n, registry, depth + 1, seen_ids)?;
        }
    }
    Ok(())
}

fn check_kind(element: &str, prop: &str, kind: PropKind, value: &PropValue) -> SceneResult<()> {
    let ok = match kind {
        PropKind::Text => matches!(value, PropValue::Text(_)),
        PropKind::Number => matches!(value, PropValue::Number(_)),
        PropKind::Bool => matches!(value, PropValue::Bool(_)),
    };
    if !ok {
        return Err(SceneError::InvalidPropType {
            element: element.to_string(),
            prop: prop.to_string(),
            expected: kind.name().to_string(),
        });
    }
    // Color-bearing universal props must parse.
    if (prop == "color" || prop == "background") && kind == PropKind::Text {
        if let PropValue::Text(s) = value {
            parse_hex_color(s)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ElementRegistry {
        ElementRegistry::default()
    }

    #[test]
    fn accepts_minimal_tree() {
        let root = Node::new("stack")
            .with_child(Node::new("button").with_text("Hi"))
            .with_child(Node::new("text").with_text("hello"));
        assert!(validate(&root, &registry()).is_ok());
    }

    #[test]
    fn rejects_unknown_element() {
        let root = Node::new("iframe");
        assert_eq!(
            validate(&root, &registry()),
            Err(SceneError::UnknownElement {
                tag: "iframe".into()
            })
        );
    }

    #[test]
    fn rejects_unknown_prop() {
        let root = Node::new("button").with_prop("onclick", PropValue::Text("x".into()));
        assert!(matches!(
            validate(&root, &registry()),
            Err(SceneError::UnknownProp { .. })
        ));
    }

    #[test]
    fn rejects_wrong_prop_type() {
        let root = Node::new("button").with_prop("disabled", PropValue::Text("yes".into()));
        assert!(matches!(
            validate(&root, &registry()),
            Err(SceneError::InvalidPropType { .. })
        ));
    }

    #[test]
    fn rejects_children_on_childless_element() {
        let root = Node::new("input").with_text("nope");
        assert!(matches!(
            validate(&root, &registry()),
            Err(SceneError::ChildrenNotAllowed { .. })
        ));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let root = Node::new("stack")
            .with_child(Node::new("button").with_prop("id", PropValue::Text("a".into())))
            .with_child(Node::new("input").with_prop("id", PropValue::Text("a".into())));
        assert_eq!(
            validate(&root, &registry()),
            Err(SceneError::DuplicateId { id: "a".into() })
        );
    }

    #[test]
    fn rejects_too_deep_nesting() {
        let mut node = Node::new("text");
        for _ in 0..MAX_NESTING_DEPTH {
            node = Node::new("stack").with_child(node);
        }
        assert_eq!(
            validate(&node, &registry()),
            Err(SceneError::MaxNestingDepthExceeded {
                max_depth: MAX_NESTING_DEPTH
            })
        );
    }

    #[test]
    fn rejects_bad_color_prop() {
        let root = Node::new("text").with_prop("color", PropValue::Text("red".into()));
        assert!(matches!(
            validate(&root, &registry()),
            Err(SceneError::InvalidColor { .. })
        ));
    }
}
