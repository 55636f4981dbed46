use pretty_assertions::assert_eq;
use std::time::Duration;
use vitrine_core::{
    accept, extract_default, spawn, BridgeConfig, Envelope, HostCommand, HostEvent, HostState,
    HostStore, IsolationHost, ScopeConfig,
};

const HELLO: &str = "export default function Hello() return <button>Hi</button> end";

fn fast_config() -> ScopeConfig {
    ScopeConfig {
        eval_deadline: Duration::from_millis(200),
        ..ScopeConfig::default()
    }
}

// --- Isolation host state machine -------------------------------------------

#[test]
fn valid_artifact_mounts_and_reports_success() {
    let mut host = IsolationHost::new(ScopeConfig::default());
    assert_eq!(host.state(), HostState::Idle);

    let event = host.load_code(HELLO);
    assert_eq!(event, HostEvent::RenderSuccess);
    assert_eq!(host.state(), HostState::Mounted);

    let mounted = host.mounted().unwrap();
    assert_eq!(mounted.tag, "button");
    assert_eq!(mounted.text_content(), "Hi");
}

#[test]
fn missing_default_export_is_a_single_render_error() {
    let mut host = IsolationHost::new(ScopeConfig::default());
    let event = host.load_code("local x = 1");
    match event {
        HostEvent::RenderError { message } => assert!(
            message.contains("default export"),
            "message should name the default export: {message}"
        ),
        other => panic!("expected render error, got {other:?}"),
    }
    assert_eq!(host.state(), HostState::Failed);
    assert!(host.mounted().is_none());
}

#[test]
fn syntax_error_reports_before_evaluation() {
    let mut host = IsolationHost::new(ScopeConfig::default());
    let event = host.load_code("local x = {");
    match event {
        HostEvent::RenderError { message } => assert!(
            message.contains("syntax error"),
            "message should reference the parse failure: {message}"
        ),
        other => panic!("expected render error, got {other:?}"),
    }
    assert_eq!(host.state(), HostState::Failed);
}

#[test]
fn non_callable_default_export_is_a_render_error() {
    let mut host = IsolationHost::new(ScopeConfig::default());
    let event = host.load_code("export default 42");
    match event {
        HostEvent::RenderError { message } => {
            assert!(message.contains("default export"));
            assert!(message.contains("function"));
        }
        other => panic!("expected render error, got {other:?}"),
    }
}

#[test]
fn import_fails_at_evaluation_with_blocked_require() {
    let mut host = IsolationHost::new(ScopeConfig::default());
    let event = host.load_code("import fs from \"fs\"\nexport default function() return fs end");
    match event {
        HostEvent::RenderError { message } => {
            assert!(message.contains("require is not available"));
        }
        other => panic!("expected render error, got {other:?}"),
    }
}

#[test]
fn component_must_return_an_element() {
    let mut host = IsolationHost::new(ScopeConfig::default());
    let event = host.load_code("export default function() return 5 end");
    match event {
        HostEvent::RenderError { message } => assert!(message.contains("expected an element")),
        other => panic!("expected render error, got {other:?}"),
    }
}

#[test]
fn disallowed_elements_fail_validation() {
    let event = IsolationHost::new(ScopeConfig::default())
        .load_code("export default function() return <iframe>x</iframe> end");
    match event {
        HostEvent::RenderError { message } => assert!(message.contains("iframe")),
        other => panic!("expected render error, got {other:?}"),
    }
}

#[test]
fn reload_is_idempotent_and_replaces_the_old_scene() {
    let mut host = IsolationHost::new(ScopeConfig::default());
    assert_eq!(host.load_code(HELLO), HostEvent::RenderSuccess);
    let first = host.mounted().unwrap().clone();

    assert_eq!(host.load_code(HELLO), HostEvent::RenderSuccess);
    assert_eq!(host.state(), HostState::Mounted);
    let second = host.mounted().unwrap();

    // Same terminal state, same tree, no accumulation of old content.
    assert_eq!(*second, first);
    assert_eq!(second.children.len(), 1);
}

#[test]
fn failed_reload_clears_the_previous_render() {
    let mut host = IsolationHost::new(ScopeConfig::default());
    assert_eq!(host.load_code(HELLO), HostEvent::RenderSuccess);
    assert!(matches!(
        host.load_code("local x = {"),
        HostEvent::RenderError { .. }
    ));
    assert_eq!(host.state(), HostState::Failed);
    assert!(host.mounted().is_none(), "stale scene must not survive");
}

#[test]
fn runaway_code_hits_the_deadline_and_the_host_survives() {
    let mut host = IsolationHost::new(fast_config());
    let event = host.load_code("while true do end");
    match event {
        HostEvent::RenderError { message } => assert!(
            message.contains("timed out"),
            "deadline should be named: {message}"
        ),
        other => panic!("expected render error, got {other:?}"),
    }
    // The watchdog recovered the thread; the next load works.
    assert_eq!(host.load_code(HELLO), HostEvent::RenderSuccess);
}

#[test]
fn runaway_component_call_also_hits_the_deadline() {
    let mut host = IsolationHost::new(fast_config());
    let event = host.load_code("export default function() while true do end end");
    assert!(matches!(event, HostEvent::RenderError { .. }));
}

#[test]
fn scope_is_rebuilt_per_load() {
    // A global leaked by one artifact must not be visible to the next.
    let mut host = IsolationHost::new(ScopeConfig::default());
    let event =
        host.load_code("leak = 7\nexport default function() return <text>a</text> end");
    assert_eq!(event, HostEvent::RenderSuccess);

    let event = host.load_code(
        "export default function() return <text>{tostring(leak)}</text> end",
    );
    assert_eq!(event, HostEvent::RenderSuccess);
    assert_eq!(host.mounted().unwrap().text_content(), "nil");
}

// --- Capture -----------------------------------------------------------------

#[test]
fn capture_before_any_render_is_an_error() {
    let host = IsolationHost::new(ScopeConfig::default());
    let err = host.capture(None).unwrap_err();
    assert!(err.to_string().contains("nothing mounted"));
}

#[test]
fn capture_after_failed_render_is_an_error() {
    let mut host = IsolationHost::new(ScopeConfig::default());
    let _ = host.load_code("local x = {");
    assert!(host.capture(None).is_err());
}

#[test]
fn capture_yields_a_nonempty_data_url() {
    let mut host = IsolationHost::new(ScopeConfig::default());
    assert_eq!(host.load_code(HELLO), HostEvent::RenderSuccess);
    let image = host.capture(None).unwrap();
    assert!(image.starts_with("data:image/png;base64,"));
    assert!(image.len() > "data:image/png;base64,".len());
}

#[test]
fn selector_capture_targets_the_sub_element() {
    let mut host = IsolationHost::new(ScopeConfig::default());
    let code = "export default function()\n  return <stack>\n    <text id=\"title\">Hello</text>\n    <button id=\"go\">Go</button>\n  </stack>\nend";
    assert_eq!(host.load_code(code), HostEvent::RenderSuccess);
    assert!(host.capture(Some("#go")).is_ok());
    assert!(host.capture(Some("button")).is_ok());

    let err = host.capture(Some("#missing")).unwrap_err();
    assert!(err.to_string().contains("not found"));
}

// --- Bridge protocol ----------------------------------------------------------

#[tokio::test]
async fn render_then_capture_roundtrip_over_the_bridge() {
    let mut view = spawn(ScopeConfig::default(), BridgeConfig::default()).unwrap();
    view.load_code(HELLO).await.unwrap();
    assert_eq!(view.recv().await, Some(HostEvent::RenderSuccess));

    view.capture_request(None).await.unwrap();
    match view.recv().await {
        Some(HostEvent::CaptureResult { image }) => {
            assert!(image.starts_with("data:image/png;base64,"));
        }
        other => panic!("expected capture result, got {other:?}"),
    }
    view.close();
}

#[tokio::test]
async fn events_arrive_in_command_order() {
    let mut view = spawn(ScopeConfig::default(), BridgeConfig::default()).unwrap();
    view.load_code(HELLO).await.unwrap();
    view.load_code("local x = {").await.unwrap();
    view.capture_request(None).await.unwrap();

    assert_eq!(view.recv().await, Some(HostEvent::RenderSuccess));
    assert!(matches!(
        view.recv().await,
        Some(HostEvent::RenderError { .. })
    ));
    // The second load failed, so the queued capture finds nothing mounted.
    match view.recv().await {
        Some(HostEvent::CaptureError { message }) => {
            assert!(message.contains("nothing mounted"));
        }
        other => panic!("expected capture error, got {other:?}"),
    }
    view.close();
}

#[tokio::test]
async fn selector_miss_over_the_bridge_is_a_capture_error() {
    let mut view = spawn(ScopeConfig::default(), BridgeConfig::default()).unwrap();
    view.load_code(HELLO).await.unwrap();
    assert_eq!(view.recv().await, Some(HostEvent::RenderSuccess));

    view.capture_request(Some("#nope".to_string())).await.unwrap();
    match view.recv().await {
        Some(HostEvent::CaptureError { message }) => assert!(message.contains("not found")),
        other => panic!("expected capture error, got {other:?}"),
    }
    view.close();
}

#[test]
fn mismatched_origins_are_dropped_without_a_state_transition() {
    let bridge = BridgeConfig::default();
    let mut host = IsolationHost::new(ScopeConfig::default());

    let forged = Envelope {
        origin: "https://evil.example".to_string(),
        message: HostCommand::LoadCode {
            code: HELLO.to_string(),
        },
    };
    // The host loop only dispatches envelopes that pass `accept`; a forged
    // origin never reaches the state machine, whatever the message kind.
    assert!(accept(forged, &bridge.app_origin).is_err());
    assert_eq!(host.state(), HostState::Idle);

    let forged_capture = Envelope {
        origin: "https://evil.example".to_string(),
        message: HostCommand::CaptureRequest { selector: None },
    };
    assert!(accept(forged_capture, &bridge.app_origin).is_err());
    assert_eq!(host.state(), HostState::Idle);
    assert!(host.mounted().is_none());

    let genuine = Envelope {
        origin: bridge.app_origin.clone(),
        message: HostCommand::LoadCode {
            code: HELLO.to_string(),
        },
    };
    let command = accept(genuine, &bridge.app_origin).unwrap();
    assert_eq!(host.handle(command), HostEvent::RenderSuccess);
    assert_eq!(host.state(), HostState::Mounted);
}

#[test]
fn bridge_messages_have_a_stable_wire_shape() {
    let command = HostCommand::LoadCode {
        code: "return 1".to_string(),
    };
    assert_eq!(
        serde_json::to_value(&command).unwrap(),
        serde_json::json!({ "type": "load_code", "code": "return 1" })
    );

    // Selector-less capture requests omit the field entirely.
    let capture = HostCommand::CaptureRequest { selector: None };
    assert_eq!(
        serde_json::to_value(&capture).unwrap(),
        serde_json::json!({ "type": "capture_request" })
    );

    let event = HostEvent::RenderError {
        message: "boom".to_string(),
    };
    assert_eq!(
        serde_json::to_value(&event).unwrap(),
        serde_json::json!({ "type": "render_error", "message": "boom" })
    );

    let envelope = Envelope {
        origin: "app://chat".to_string(),
        message: HostEvent::RenderSuccess,
    };
    let json = serde_json::to_string(&envelope).unwrap();
    let back: Envelope<HostEvent> = serde_json::from_str(&json).unwrap();
    assert_eq!(back, envelope);
}

// --- Extraction to render, end to end ----------------------------------------

#[tokio::test]
async fn extracted_block_renders_over_the_bridge() {
    let message = format!("Sure, here is the component:\n\n```artifact\n{HELLO}\n```\n");
    let artifacts = extract_default(&message);
    assert_eq!(artifacts.len(), 1);

    let mut view = spawn(ScopeConfig::default(), BridgeConfig::default()).unwrap();
    view.load_code(artifacts[0].code.clone()).await.unwrap();
    assert_eq!(view.recv().await, Some(HostEvent::RenderSuccess));
    view.close();
}

// --- Host store ---------------------------------------------------------------

#[tokio::test]
async fn store_runs_views_independently() {
    let store = HostStore::new();
    let mut a = store
        .open("pane-a", ScopeConfig::default(), BridgeConfig::default())
        .unwrap();
    let mut b = store
        .open("pane-b", ScopeConfig::default(), BridgeConfig::default())
        .unwrap();
    assert_eq!(store.len(), 2);
    assert_ne!(store.id("pane-a"), store.id("pane-b"));

    store.load_code("pane-a", HELLO).await.unwrap();
    store.load_code("pane-b", "local x = {").await.unwrap();

    assert_eq!(a.recv().await, Some(HostEvent::RenderSuccess));
    assert!(matches!(b.recv().await, Some(HostEvent::RenderError { .. })));

    drop(b);
    assert!(store.close("pane-b"));
    assert!(!store.close("pane-b"));
    assert_eq!(store.len(), 1);

    // pane-a is unaffected by pane-b's demise.
    store.capture_request("pane-a", None).await.unwrap();
    assert!(matches!(
        a.recv().await,
        Some(HostEvent::CaptureResult { .. })
    ));
    drop(a);
    store.close("pane-a");
}
