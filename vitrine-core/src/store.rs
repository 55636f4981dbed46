//! Live artifact views keyed by caller-chosen name.
//!
//! The embedding application typically shows one artifact per chat pane;
//! the store lets several panes run isolated hosts side by side. Opening a
//! name that already exists replaces (and shuts down) the old view.

use crate::bridge::{self, BridgeConfig, BridgeSender, EventStream};
use crate::error::{HostError, ProtocolError};
use crate::scope::ScopeConfig;
use dashmap::DashMap;
use uuid::Uuid;

struct View {
    id: Uuid,
    sender: BridgeSender,
    thread: Option<std::thread::JoinHandle<()>>,
}

/// Concurrent registry of live artifact views, one isolation host each.
#[derive(Default)]
pub struct HostStore {
    views: DashMap<String, View>,
}

impl HostStore {
    pub fn new() -> Self {
        Self {
            views: DashMap::new(),
        }
    }

    /// Spawn a host for `name` and return its event stream for the caller
    /// to consume. An existing view under the same name is shut down.
    pub fn open(
        &self,
        name: &str,
        scope: ScopeConfig,
        bridge_config: BridgeConfig,
    ) -> Result<EventStream, HostError> {
        let handle = bridge::spawn(scope, bridge_config)?;
        let (id, sender, events, thread) = handle.into_parts();
        if let Some((_, old)) = self.views.remove(name) {
            shutdown(old);
        }
        self.views
            .insert(name.to_string(), View { id, sender, thread });
        Ok(events)
    }

    /// Stable id of a live view.
    pub fn id(&self, name: &str) -> Option<Uuid> {
        self.views.get(name).map(|v| v.id)
    }

    /// Cheap-to-clone command sender for a live view.
    pub fn sender(&self, name: &str) -> Option<BridgeSender> {
        self.views.get(name).map(|v| v.sender.clone())
    }

    pub async fn load_code(
        &self,
        name: &str,
        code: impl Into<String>,
    ) -> Result<(), ProtocolError> {
        let sender = self.sender(name).ok_or(ProtocolError::Closed)?;
        sender.load_code(code).await
    }

    pub async fn capture_request(
        &self,
        name: &str,
        selector: Option<String>,
    ) -> Result<(), ProtocolError> {
        let sender = self.sender(name).ok_or(ProtocolError::Closed)?;
        sender.capture_request(selector).await
    }

    /// Shut a view down; returns false when the name is unknown. Joins the
    /// host thread, so drain or drop the view's event stream first.
    pub fn close(&self, name: &str) -> bool {
        match self.views.remove(name) {
            Some((_, view)) => {
                shutdown(view);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }
}

fn shutdown(view: View) {
    drop(view.sender);
    if let Some(thread) = view.thread {
        let _ = thread.join();
    }
}
