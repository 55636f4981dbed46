//! Bridge protocol: the message contract between the hosting application
//! and the isolation host.
//!
//! The two sides are separate single-threaded event loops joined only by
//! channels; every message travels in an [`Envelope`] stamped with the
//! sender's origin, and each receiver validates that origin before acting.
//! Envelopes failing the check are dropped and logged, never processed,
//! never surfaced to the peer. Per direction, channel order is delivery
//! order; across directions nothing is guaranteed, so callers must wait
//! for `render_success` before requesting a capture.

use crate::error::{HostError, ProtocolError};
use crate::host::IsolationHost;
use crate::scope::ScopeConfig;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Commands from the hosting application to the isolation host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostCommand {
    LoadCode {
        code: String,
    },
    CaptureRequest {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        selector: Option<String>,
    },
}

/// Events from the isolation host back to the hosting application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostEvent {
    RenderSuccess,
    RenderError { message: String },
    CaptureResult { image: String },
    CaptureError { message: String },
}

/// One unit of cross-context traffic: the payload plus the sender's
/// declared origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub origin: String,
    pub message: T,
}

/// Validate an inbound envelope against the expected peer origin.
/// Mismatches fail closed: logged locally, dropped, and the sender is
/// never told.
pub fn accept<T>(envelope: Envelope<T>, expected_origin: &str) -> Result<T, ProtocolError> {
    if envelope.origin != expected_origin {
        tracing::warn!(
            target: "vitrine::bridge",
            got = %envelope.origin,
            expected = %expected_origin,
            "dropping message from unexpected origin"
        );
        return Err(ProtocolError::OriginMismatch {
            expected: expected_origin.to_string(),
            got: envelope.origin,
        });
    }
    Ok(envelope.message)
}

/// Origins and channel sizing for one bridge.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub app_origin: String,
    pub host_origin: String,
    pub capacity: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            app_origin: "app://chat".to_string(),
            host_origin: "sandbox://artifact".to_string(),
            capacity: 16,
        }
    }
}

/// Application-side command sender. Cheap to clone; every outbound message
/// is stamped with the application origin.
#[derive(Debug, Clone)]
pub struct BridgeSender {
    origin: String,
    tx: mpsc::Sender<Envelope<HostCommand>>,
}

impl BridgeSender {
    pub async fn send(&self, command: HostCommand) -> Result<(), ProtocolError> {
        self.tx
            .send(Envelope {
                origin: self.origin.clone(),
                message: command,
            })
            .await
            .map_err(|_| ProtocolError::Closed)
    }

    pub async fn load_code(&self, code: impl Into<String>) -> Result<(), ProtocolError> {
        self.send(HostCommand::LoadCode { code: code.into() }).await
    }

    pub async fn capture_request(&self, selector: Option<String>) -> Result<(), ProtocolError> {
        self.send(HostCommand::CaptureRequest { selector }).await
    }
}

/// Application-side event stream. Events from unexpected origins are
/// dropped here, before the caller ever sees them.
#[derive(Debug)]
pub struct EventStream {
    peer_origin: String,
    rx: mpsc::Receiver<Envelope<HostEvent>>,
}

impl EventStream {
    /// Next origin-validated event; `None` once the host loop has exited.
    pub async fn recv(&mut self) -> Option<HostEvent> {
        loop {
            let envelope = self.rx.recv().await?;
            if let Ok(message) = accept(envelope, &self.peer_origin) {
                return Some(message);
            }
        }
    }
}

/// Application-side endpoint of one spawned isolation host.
pub struct BridgeHandle {
    pub id: Uuid,
    sender: BridgeSender,
    events: EventStream,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl BridgeHandle {
    pub async fn load_code(&self, code: impl Into<String>) -> Result<(), ProtocolError> {
        self.sender.load_code(code).await
    }

    pub async fn capture_request(&self, selector: Option<String>) -> Result<(), ProtocolError> {
        self.sender.capture_request(selector).await
    }

    pub async fn recv(&mut self) -> Option<HostEvent> {
        self.events.recv().await
    }

    pub fn sender(&self) -> BridgeSender {
        self.sender.clone()
    }

    /// Tear down the view: drops both channel ends and joins the host
    /// thread. Joining blocks while clones of the sender are still alive.
    pub fn close(self) {
        let BridgeHandle {
            sender,
            events,
            thread,
            ..
        } = self;
        drop(sender);
        drop(events);
        if let Some(thread) = thread {
            let _ = thread.join();
        }
    }

    pub(crate) fn into_parts(
        self,
    ) -> (
        Uuid,
        BridgeSender,
        EventStream,
        Option<std::thread::JoinHandle<()>>,
    ) {
        (self.id, self.sender, self.events, self.thread)
    }
}

/// Spawn an isolation host event loop on its own thread and return the
/// application side of the bridge.
pub fn spawn(scope: ScopeConfig, bridge: BridgeConfig) -> Result<BridgeHandle, HostError> {
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<Envelope<HostCommand>>(bridge.capacity.max(1));
    let (evt_tx, evt_rx) = mpsc::channel::<Envelope<HostEvent>>(bridge.capacity.max(1));
    let id = Uuid::new_v4();

    let app_origin = bridge.app_origin.clone();
    let host_origin = bridge.host_origin.clone();
    let thread = std::thread::Builder::new()
        .name(format!("vitrine-host-{id}"))
        .spawn(move || {
            let mut host = IsolationHost::new(scope);
            while let Some(envelope) = cmd_rx.blocking_recv() {
                let Ok(command) = accept(envelope, &app_origin) else {
                    continue;
                };
                let event = host.handle(command);
                let envelope = Envelope {
                    origin: host_origin.clone(),
                    message: event,
                };
                if evt_tx.blocking_send(envelope).is_err() {
                    break;
                }
            }
        })
        .map_err(|e| HostError::Spawn(e.to_string()))?;

    Ok(BridgeHandle {
        id,
        sender: BridgeSender {
            origin: bridge.app_origin,
            tx: cmd_tx,
        },
        events: EventStream {
            peer_origin: bridge.host_origin,
            rx: evt_rx,
        },
        thread: Some(thread),
    })
}
