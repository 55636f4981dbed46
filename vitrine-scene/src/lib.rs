//! # Vitrine scene model
//!
//! The typed element tree an artifact renders into, plus the allow-list
//! registry that constrains it.
//!
//! Evaluated artifact code builds trees out of allow-listed primitives
//! (button, input, text, stack by default); the isolation host converts
//! the evaluated value into a [`Node`] tree and validates it here before
//! mounting. This crate is pure data: no Lua, no I/O, no rendering.
//!
//! ## Example
//! ```
//! use vitrine_scene::{validate, ElementRegistry, Node};
//!
//! let tree = Node::new("stack").with_child(Node::new("button").with_text("Hi"));
//! validate(&tree, &ElementRegistry::default()).expect("tree is valid");
//! ```

pub mod error;
pub mod node;
pub mod registry;
pub mod selector;
pub mod style;
pub mod validator;

// --- Core types ---
pub use error::{SceneError, SceneResult};
pub use node::{Child, Node, PropValue};
pub use registry::{ElementRegistry, ElementSpec, PropDef, PropKind, UNIVERSAL_PROPS};
pub use selector::{find, Selector};
pub use style::{parse_hex_color, Color, Theme};
pub use validator::{validate, MAX_NESTING_DEPTH};
