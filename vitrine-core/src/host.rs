//! Isolation host: owns one artifact's render lifecycle.
//!
//! The host runs transform, evaluate and mount for each `load-code`, holds
//! the mounted scene, and serves capture requests against it. State is an
//! explicit machine, `Idle -> Compiling -> {Mounted | Failed}`, and every
//! new `load-code` restarts at `Compiling` with the previous scene fully
//! cleared; there is no partial reuse and no automatic retry.

use crate::bridge::{HostCommand, HostEvent};
use crate::capture;
use crate::error::{CaptureError, EvalError, PipelineError};
use crate::eval;
use crate::scope::{self, ScopeConfig};
use crate::transform;
use mlua::{Table, Value};
use vitrine_scene::{
    validate, Child, Node, PropValue, SceneError, MAX_NESTING_DEPTH,
};

/// Render lifecycle of one artifact view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostState {
    Idle,
    Compiling,
    Mounted,
    Failed,
}

pub struct IsolationHost {
    config: ScopeConfig,
    state: HostState,
    mounted: Option<Node>,
}

impl IsolationHost {
    pub fn new(config: ScopeConfig) -> Self {
        Self {
            config,
            state: HostState::Idle,
            mounted: None,
        }
    }

    pub fn state(&self) -> HostState {
        self.state
    }

    /// The currently mounted scene, when in `Mounted` state.
    pub fn mounted(&self) -> Option<&Node> {
        self.mounted.as_ref()
    }

    /// Process one already origin-validated bridge command.
    pub fn handle(&mut self, command: HostCommand) -> HostEvent {
        match command {
            HostCommand::LoadCode { code } => self.load_code(&code),
            HostCommand::CaptureRequest { selector } => match self.capture(selector.as_deref()) {
                Ok(image) => HostEvent::CaptureResult { image },
                Err(e) => HostEvent::CaptureError {
                    message: e.to_string(),
                },
            },
        }
    }

    /// Run the full pipeline on one source. The old render is dropped
    /// before compilation starts, so a failed attempt never leaves stale
    /// content mounted.
    pub fn load_code(&mut self, code: &str) -> HostEvent {
        self.mounted = None;
        self.state = HostState::Compiling;
        match self.render(code) {
            Ok(scene) => {
                self.mounted = Some(scene);
                self.state = HostState::Mounted;
                HostEvent::RenderSuccess
            }
            Err(e) => {
                self.state = HostState::Failed;
                tracing::debug!(target: "vitrine::host", error = %e, "render failed");
                HostEvent::RenderError {
                    message: e.to_string(),
                }
            }
        }
    }

    fn render(&self, code: &str) -> Result<Node, PipelineError> {
        let module = transform::lower(code)?;
        let lua = eval::create_artifact_lua(&self.config)?;
        let execution_scope = scope::build_environment(&lua, &self.config)?;
        let component = eval::evaluate(&lua, &module, &execution_scope, &self.config)?;
        let value = eval::call_component(&lua, &component, &self.config)?;
        let scene = node_from_value(&value, 0).map_err(PipelineError::Eval)?;
        validate(&scene, &self.config.registry)
            .map_err(|e| PipelineError::Eval(EvalError::Scene(e)))?;
        Ok(scene)
    }

    /// Capture the mounted scene (or a selector-resolved sub-element) as a
    /// PNG data URL. Read-only: the scene is unaffected, and a failure
    /// leaves the current render in place.
    pub fn capture(&self, selector: Option<&str>) -> Result<String, CaptureError> {
        let root = self.mounted.as_ref().ok_or(CaptureError::NotMounted)?;
        let target = capture::resolve_target(root, selector)?;
        capture::capture_data_url(target)
    }
}

/// Convert the value a component returned into a scene node. The depth cap
/// doubles as cycle protection: evaluated code can hand back self-
/// referential tables.
fn node_from_value(value: &Value, depth: usize) -> Result<Node, EvalError> {
    if depth >= MAX_NESTING_DEPTH {
        return Err(EvalError::Scene(SceneError::MaxNestingDepthExceeded {
            max_depth: MAX_NESTING_DEPTH,
        }));
    }
    let Value::Table(table) = value else {
        return Err(EvalError::NotAnElement {
            got: value.type_name().to_string(),
        });
    };
    let is_element = table
        .get::<Option<bool>>(scope::ELEMENT_MARKER)
        .map_err(lua_err)?
        .unwrap_or(false);
    if !is_element {
        return Err(EvalError::NotAnElement {
            got: "plain table".to_string(),
        });
    }

    let tag: String = table.get("tag").map_err(lua_err)?;
    let mut node = Node::new(tag);

    if let Some(props) = table.get::<Option<Table>>("props").map_err(lua_err)? {
        for pair in props.pairs::<Value, Value>() {
            let (key, value) = pair.map_err(lua_err)?;
            let Value::String(name) = key else {
                return Err(EvalError::Scene(SceneError::InvalidPropType {
                    element: node.tag.clone(),
                    prop: format!("{key:?}"),
                    expected: "a string key".to_string(),
                }));
            };
            let name = name.to_str().map_err(lua_err)?.to_string();
            let prop = match value {
                Value::Boolean(b) => PropValue::Bool(b),
                Value::Integer(n) => PropValue::Number(n as f64),
                Value::Number(n) => PropValue::Number(n),
                Value::String(s) => PropValue::Text(s.to_str().map_err(lua_err)?.to_string()),
                other => {
                    return Err(EvalError::Scene(SceneError::InvalidPropType {
                        element: node.tag.clone(),
                        prop: name,
                        expected: format!("text, number or bool (got {})", other.type_name()),
                    }));
                }
            };
            node.props.insert(name, prop);
        }
    }

    if let Some(children) = table.get::<Option<Table>>("children").map_err(lua_err)? {
        for item in children.sequence_values::<Value>() {
            let item = item.map_err(lua_err)?;
            match item {
                Value::String(s) => {
                    node.children
                        .push(Child::Text(s.to_str().map_err(lua_err)?.to_string()));
                }
                Value::Integer(n) => node.children.push(Child::Text(n.to_string())),
                Value::Number(n) => node.children.push(Child::Text(n.to_string())),
                // Booleans render nothing, so `cond and <x/>` works as a
                // conditional child.
                Value::Boolean(_) | Value::Nil => {}
                other => {
                    let child = node_from_value(&other, depth + 1)?;
                    node.children.push(Child::Element(child));
                }
            }
        }
    }

    Ok(node)
}

fn lua_err(e: mlua::Error) -> EvalError {
    EvalError::Runtime(e.to_string())
}
