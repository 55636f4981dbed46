use std::time::Duration;
use thiserror::Error;
use vitrine_scene::SceneError;

/// Source failed to lower or compile. Retryable only by editing the source.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("parse error at line {line}, column {column}: {message}")]
    Parse {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("duplicate default export at line {line}: only one default export is allowed")]
    DuplicateDefaultExport { line: usize },

    #[error("luau syntax error: {0}")]
    Luau(String),
}

/// Evaluated code failed at runtime, or produced no usable component.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("luau runtime error: {0}")]
    Runtime(String),

    #[error("artifact evaluation timed out after {}ms", .0.as_millis())]
    Deadline(Duration),

    #[error("artifact exceeded the {limit}-byte memory limit")]
    Memory { limit: usize },

    #[error("no valid default export: {reason}")]
    BadDefaultExport { reason: String },

    #[error("component returned {got}: expected an element")]
    NotAnElement { got: String },

    #[error("invalid element tree: {0}")]
    Scene(#[from] SceneError),
}

/// Message failed the boundary checks. Dropped and logged, never forwarded.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("message origin '{got}' does not match expected origin '{expected}'")]
    OriginMismatch { expected: String, got: String },

    #[error("bridge peer is closed")]
    Closed,
}

/// Capture could not produce an image. The mounted component is unaffected.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CaptureError {
    #[error("nothing mounted: capture requires a successful render")]
    NotMounted,

    #[error("target element not found: no element matches '{selector}'")]
    TargetNotFound { selector: String },

    #[error("invalid capture selector: {0}")]
    Selector(#[from] SceneError),

    #[error("image encode failed: {0}")]
    Encode(String),
}

/// The host's Lua runtime could not be constructed. Fatal for the session.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HostError {
    #[error("failed to construct the Luau runtime: {0}")]
    Lua(String),

    #[error("failed to spawn the isolation host thread: {0}")]
    Spawn(String),
}

/// Any failure of one render attempt, as reported across the bridge.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Host(#[from] HostError),
}
