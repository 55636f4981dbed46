//! # Vitrine core
//!
//! The artifact transpile–evaluate–render–capture pipeline.
//!
//! Assistant messages carry UI components as tagged fenced code blocks
//! ([`extract`]). Each artifact is lowered from the author dialect to a
//! plain Luau chunk ([`transform`]), evaluated in a fresh sandboxed state
//! with only the enumerated scope bindings ([`scope`], [`eval`]), and
//! mounted as a validated scene tree by the isolation host ([`host`]).
//! The host runs on its own thread behind an origin-checked message
//! bridge ([`bridge`]), and serves on-demand PNG captures of the mounted
//! scene ([`capture`]).
//!
//! ## Example
//! ```no_run
//! use vitrine_core::{spawn, BridgeConfig, HostEvent, ScopeConfig};
//!
//! # async fn demo() {
//! let mut view = spawn(ScopeConfig::default(), BridgeConfig::default()).unwrap();
//! view.load_code("export default function Hello() return <button>Hi</button> end")
//!     .await
//!     .unwrap();
//! if let Some(HostEvent::RenderSuccess) = view.recv().await {
//!     view.capture_request(None).await.unwrap();
//! }
//! # }
//! ```

pub mod bridge;
pub mod capture;
pub mod error;
pub mod eval;
pub mod extract;
pub mod host;
pub mod scope;
pub mod store;
pub mod transform;

// --- Core types ---
pub use bridge::{
    accept, spawn, BridgeConfig, BridgeHandle, BridgeSender, Envelope, EventStream, HostCommand,
    HostEvent,
};
pub use error::{
    CaptureError, CompileError, EvalError, HostError, PipelineError, ProtocolError,
};
pub use extract::{extract_artifacts, extract_default, ArtifactSource, DEFAULT_ARTIFACT_TAG};
pub use host::{HostState, IsolationHost};
pub use scope::ScopeConfig;
pub use store::HostStore;
pub use transform::{lower, CompiledModule};
