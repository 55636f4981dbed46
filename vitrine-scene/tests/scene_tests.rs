use pretty_assertions::assert_eq;
use vitrine_scene::{
    find, validate, Child, ElementRegistry, ElementSpec, Node, PropDef, PropKind, PropValue,
    SceneError, Selector,
};

fn sample_tree() -> Node {
    Node::new("stack")
        .with_prop("gap", PropValue::Number(8.0))
        .with_child(
            Node::new("text")
                .with_prop("id", PropValue::Text("title".into()))
                .with_text("Sign in"),
        )
        .with_child(Node::new("input").with_prop("placeholder", PropValue::Text("email".into())))
        .with_child(
            Node::new("button")
                .with_prop("id", PropValue::Text("submit".into()))
                .with_text("Continue"),
        )
}

#[test]
fn default_registry_is_the_minimal_allow_list() {
    let registry = ElementRegistry::default();
    let mut tags: Vec<&str> = registry.tags().collect();
    tags.sort();
    assert_eq!(tags, vec!["button", "input", "stack", "text"]);
}

#[test]
fn default_registry_accepts_the_sample_tree() {
    assert!(validate(&sample_tree(), &ElementRegistry::default()).is_ok());
}

#[test]
fn registry_is_configuration_not_code() {
    // A custom registry with one extra element admits trees the default rejects.
    let mut specs = ElementRegistry::default().specs().to_vec();
    specs.push(ElementSpec {
        tag: "badge".to_string(),
        props: vec![PropDef::optional("label", PropKind::Text)],
        children: false,
    });
    let custom = ElementRegistry::new(specs);

    let tree = Node::new("badge").with_prop("label", PropValue::Text("new".into()));
    assert!(matches!(
        validate(&tree, &ElementRegistry::default()),
        Err(SceneError::UnknownElement { .. })
    ));
    assert!(validate(&tree, &custom).is_ok());
}

#[test]
fn selector_resolves_depth_first() {
    let tree = sample_tree();
    let by_id = find(&tree, &Selector::parse("#submit").unwrap()).unwrap();
    assert_eq!(by_id.tag, "button");
    assert_eq!(by_id.text_content(), "Continue");

    // Tag selectors take the first match in document order.
    let by_tag = find(&tree, &Selector::parse("text").unwrap()).unwrap();
    assert_eq!(by_tag.id(), Some("title"));
}

#[test]
fn nodes_serialize_to_stable_json() {
    let node = Node::new("button")
        .with_prop("id", PropValue::Text("ok".into()))
        .with_prop("disabled", PropValue::Bool(false))
        .with_text("OK");
    let json = serde_json::to_value(&node).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "tag": "button",
            "props": { "disabled": false, "id": "ok" },
            "children": ["OK"]
        })
    );

    let back: Node = serde_json::from_value(json).unwrap();
    assert_eq!(back, node);
}

#[test]
fn text_and_element_children_coexist() {
    let node = Node::new("stack")
        .with_text("before")
        .with_child(Node::new("text").with_text("inner"))
        .with_text("after");
    assert_eq!(node.children.len(), 3);
    assert_eq!(node.child_elements().count(), 1);
    assert!(matches!(node.children[0], Child::Text(_)));
}
