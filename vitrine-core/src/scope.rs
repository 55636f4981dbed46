//! ExecutionScope construction.
//!
//! The environment an artifact chunk runs in is built from scratch for
//! every evaluation: the `ui` runtime table, one PascalCase constructor per
//! allow-listed element, the safe Luau stdlib tables, the `module` /
//! `exports` output slots, and error-raising stubs for blocked globals.
//! Nothing else is reachable: a name outside this enumerated set is
//! simply nil in the evaluated chunk.

use crate::error::HostError;
use mlua::{Lua, Table, Value, Variadic};
use std::time::Duration;
use vitrine_scene::ElementRegistry;

/// Luau heap limit per evaluation: 1 MB.
pub const MEMORY_LIMIT_BYTES: usize = 1024 * 1024;

/// Wall-clock budget for one evaluation (top-level run or component call).
pub const EVAL_DEADLINE: Duration = Duration::from_secs(1);

/// Marker key stamped on tables produced by `ui.element`.
pub(crate) const ELEMENT_MARKER: &str = "__element";

/// Globals deliberately bound to error-raising stubs. Everything else
/// outside the scope is plain nil; these get a readable message because
/// author code copied from elsewhere reaches for them most often.
const BLOCKED_GLOBALS: &[&str] = &["require", "io", "os", "loadfile", "dofile", "debug"];

/// Safe stdlib tables exposed to artifact code.
const SAFE_STDLIB: &[&str] = &["math", "string", "table"];

/// Safe language builtins exposed to artifact code.
const SAFE_BUILTINS: &[&str] = &[
    "tostring", "tonumber", "type", "typeof", "pairs", "ipairs", "next", "select", "pcall",
    "error", "assert", "unpack",
];

/// Configuration of one isolation host: the element allow-list and the
/// evaluation budgets. The element set is a product decision; change the
/// registry, not the code.
#[derive(Debug, Clone)]
pub struct ScopeConfig {
    pub registry: ElementRegistry,
    pub expose_stdlib: bool,
    pub memory_limit: usize,
    pub eval_deadline: Duration,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            registry: ElementRegistry::default(),
            expose_stdlib: true,
            memory_limit: MEMORY_LIMIT_BYTES,
            eval_deadline: EVAL_DEADLINE,
        }
    }
}

/// The environment for one evaluation, plus the slot the default export
/// lands in. `module.exports` and `exports` alias the same table.
pub struct ExecutionScope {
    pub env: Table,
    pub exports: Table,
}

/// Build the environment table for one evaluation.
pub fn build_environment(lua: &Lua, config: &ScopeConfig) -> Result<ExecutionScope, HostError> {
    build_inner(lua, config).map_err(|e| HostError::Lua(e.to_string()))
}

fn build_inner(lua: &Lua, config: &ScopeConfig) -> mlua::Result<ExecutionScope> {
    let env = lua.create_table()?;

    // Output slots: module.exports and exports are one table.
    let exports = lua.create_table()?;
    let module = lua.create_table()?;
    module.set("exports", exports.clone())?;
    env.set("module", module)?;
    env.set("exports", exports.clone())?;

    // ui runtime: element(tag, props, children) builds a plain marked table.
    // Validation against the registry happens at mount, in one place.
    let ui = lua.create_table()?;
    ui.set(
        "element",
        lua.create_function(
            |lua, (tag, props, children): (String, Option<Table>, Option<Table>)| {
                make_element(lua, &tag, props, children)
            },
        )?,
    )?;
    env.set("ui", ui)?;

    // One PascalCase constructor per allow-listed element:
    // `Button { label = "Hi", children = { ... } }`.
    for spec in config.registry.specs() {
        let tag = spec.tag.clone();
        env.set(
            pascal_case(&tag).as_str(),
            lua.create_function(move |lua, props: Option<Table>| {
                let mut children = None;
                if let Some(ref p) = props {
                    if let Some(Value::Table(list)) = p.get::<Option<Value>>("children")? {
                        p.set("children", Value::Nil)?;
                        children = Some(list);
                    }
                }
                make_element(lua, &tag, props, children)
            })?,
        )?;
    }

    if config.expose_stdlib {
        for name in SAFE_STDLIB.iter().chain(SAFE_BUILTINS) {
            env.set(*name, lua.globals().get::<Value>(*name)?)?;
        }
    }

    for name in BLOCKED_GLOBALS {
        let msg = format!("{name} is not available in artifact code");
        env.set(
            *name,
            lua.create_function(move |_, _: Variadic<Value>| {
                Err::<(), _>(mlua::Error::RuntimeError(msg.clone()))
            })?,
        )?;
    }

    // print goes to the host's log, never to the embedder.
    env.set(
        "print",
        lua.create_function(|_, args: Variadic<Value>| {
            let line = args
                .iter()
                .map(format_value)
                .collect::<Vec<_>>()
                .join("\t");
            tracing::debug!(target: "vitrine::artifact", "{line}");
            Ok(())
        })?,
    )?;

    Ok(ExecutionScope { env, exports })
}

fn make_element(
    lua: &Lua,
    tag: &str,
    props: Option<Table>,
    children: Option<Table>,
) -> mlua::Result<Table> {
    let element = lua.create_table()?;
    element.set(ELEMENT_MARKER, true)?;
    element.set("tag", tag.to_ascii_lowercase())?;
    element.set(
        "props",
        match props {
            Some(p) => p,
            None => lua.create_table()?,
        },
    )?;
    element.set(
        "children",
        match children {
            Some(c) => c,
            None => lua.create_table()?,
        },
    )?;
    Ok(element)
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.to_str().map(|x| x.to_string()).unwrap_or_default(),
        Value::Integer(n) => n.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Nil => "nil".to_string(),
        other => format!("{other:?}"),
    }
}

/// `button` -> `Button`, `progress-bar` -> `ProgressBar`.
fn pascal_case(tag: &str) -> String {
    let mut out = String::with_capacity(tag.len());
    for part in tag.split(['-', '_']) {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.extend(chars);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pascal_case_handles_separators() {
        assert_eq!(pascal_case("button"), "Button");
        assert_eq!(pascal_case("progress-bar"), "ProgressBar");
        assert_eq!(pascal_case("text_input"), "TextInput");
    }
}
