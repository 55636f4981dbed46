//! Evaluator: runs a lowered chunk in a constrained scope and recovers the
//! default-exported component.
//!
//! This module is the single trust boundary of the pipeline: the only
//! place where author text becomes executable code. Every evaluation gets
//! a fresh Luau state (sandboxed, memory-capped, interrupt-driven) so no
//! state leaks between render attempts, and the chunk only ever sees the
//! enumerated [`ExecutionScope`](crate::scope::ExecutionScope) bindings.

use crate::error::{CompileError, EvalError, HostError, PipelineError};
use crate::scope::{ExecutionScope, ScopeConfig};
use crate::transform::CompiledModule;
use mlua::{Function, Lua, MultiValue, Thread, ThreadStatus, Value, VmState};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Creates a Luau state for one artifact evaluation: sandbox, memory
/// limit, yield interrupt.
pub fn create_artifact_lua(config: &ScopeConfig) -> Result<Lua, HostError> {
    let lua = Lua::new();
    let _ = lua.sandbox(true);
    lua.set_memory_limit(config.memory_limit)
        .map_err(|e| HostError::Lua(e.to_string()))?;

    // Yield back to the driver every other interrupt so the deadline can
    // be checked. Only yield when no C (Rust) frame is on the stack;
    // avoids "yield across C-call boundary".
    let count = AtomicU64::new(0);
    const MAX_STACK_LEVEL: usize = 64;
    lua.set_interrupt(move |lua| {
        for level in 0..=MAX_STACK_LEVEL {
            if let Some(what) = lua.inspect_stack(level, |debug| debug.source().what) {
                if what == "C" {
                    return Ok(VmState::Continue);
                }
            } else {
                break;
            }
        }
        if count.fetch_add(1, Ordering::Relaxed) % 2 == 0 {
            return Ok(VmState::Yield);
        }
        Ok(VmState::Continue)
    });

    Ok(lua)
}

/// Compile the lowered chunk against the scope's environment and drive it
/// to completion, then recover the component at `exports.default`.
pub fn evaluate(
    lua: &Lua,
    module: &CompiledModule,
    scope: &ExecutionScope,
    config: &ScopeConfig,
) -> Result<Function, PipelineError> {
    let chunk = lua
        .load(module.chunk.as_str())
        .set_name("artifact")
        .set_environment(scope.env.clone());

    let func = chunk.into_function().map_err(|e| match e {
        mlua::Error::SyntaxError { message, .. } => {
            PipelineError::Compile(CompileError::Luau(message))
        }
        other => PipelineError::Eval(EvalError::Runtime(other.to_string())),
    })?;

    let thread = lua
        .create_thread(func)
        .map_err(|e| PipelineError::Eval(EvalError::Runtime(e.to_string())))?;
    drive(&thread, config.eval_deadline, config.memory_limit)?;

    let default: Value = scope
        .exports
        .get("default")
        .map_err(|e| PipelineError::Eval(EvalError::Runtime(e.to_string())))?;
    match default {
        Value::Function(component) => Ok(component),
        Value::Nil => Err(PipelineError::Eval(EvalError::BadDefaultExport {
            reason: "nothing was assigned to exports.default".to_string(),
        })),
        other => Err(PipelineError::Eval(EvalError::BadDefaultExport {
            reason: format!("expected a function, got {}", other.type_name()),
        })),
    }
}

/// Call the recovered component (no props) and return its first result.
pub fn call_component(
    lua: &Lua,
    component: &Function,
    config: &ScopeConfig,
) -> Result<Value, EvalError> {
    let thread = lua
        .create_thread(component.clone())
        .map_err(|e| EvalError::Runtime(e.to_string()))?;
    let values = drive(&thread, config.eval_deadline, config.memory_limit)?;
    Ok(values.into_iter().next().unwrap_or(Value::Nil))
}

/// Resume the thread until it finishes, errors, or runs out of budget.
/// The interrupt installed by [`create_artifact_lua`] yields regularly, so
/// runaway author code cannot hold the host thread past the deadline.
fn drive(thread: &Thread, deadline: Duration, memory_limit: usize) -> Result<MultiValue, EvalError> {
    let started = Instant::now();
    let mut last = MultiValue::new();
    loop {
        match thread.status() {
            ThreadStatus::Resumable => match thread.resume::<MultiValue>(()) {
                Ok(values) => last = values,
                Err(mlua::Error::MemoryError(_)) => {
                    return Err(EvalError::Memory {
                        limit: memory_limit,
                    });
                }
                Err(e) => return Err(EvalError::Runtime(e.to_string())),
            },
            ThreadStatus::Finished => return Ok(last),
            ThreadStatus::Error => return Err(EvalError::Runtime("luau thread error".to_string())),
            ThreadStatus::Running => return Ok(last),
        }
        if started.elapsed() > deadline {
            return Err(EvalError::Deadline(deadline));
        }
    }
}
