// Scripted stand-ins for the transport, the credential source and the microphone.

use crate::auth::AuthSessionProvider;
use crate::capture::{AudioDevice, ChunkSink, MediaHandle};
use crate::channel::transport::{Connector, FrameChannel, TransportEvent};
use crate::error::auth::AuthError;
use crate::error::capture::CaptureError;
use crate::error::connection::ConnectionError;

use common::{ErrorLocation, HttpStatusCode, RedactedToken};
use models::SessionCredential;

use std::collections::VecDeque;
use std::panic::Location;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use url::Url;

pub(crate) const WAIT_LIMIT: Duration = Duration::from_secs(3_600);

// ============================================
// CONNECTOR
// ============================================

#[derive(Debug, Clone, Copy)]
pub(crate) enum Outcome {
    Accept,
    Reject(u16),
    Fail,
    /// Never completes, so the handshake timeout fires.
    Hang,
}

#[derive(Default)]
struct Script {
    outcomes: VecDeque<Outcome>,
    attempts: Vec<(Url, Instant)>,
}

/// Server side of an accepted mock channel. Dropping it closes the channel.
pub(crate) struct MockServer {
    pub inbound: mpsc::UnboundedSender<TransportEvent>,
    pub outbound: mpsc::UnboundedReceiver<String>,
    pub closes: Arc<AtomicUsize>,
}

impl MockServer {
    pub fn push(&self, frame: &str) {
        self.inbound
            .send(TransportEvent::Frame(frame.to_string()))
            .expect("channel should still be read by the manager");
    }

    pub fn close_with(&self, code: u16, reason: &str) {
        self.inbound
            .send(TransportEvent::Closed {
                code: Some(code),
                reason: reason.to_string(),
            })
            .expect("channel should still be read by the manager");
    }

    pub async fn next_outbound(&mut self) -> serde_json::Value {
        let text = tokio::time::timeout(WAIT_LIMIT, self.outbound.recv())
            .await
            .expect("timed out waiting for an outbound frame")
            .expect("channel closed before a frame was sent");
        serde_json::from_str(&text).expect("outbound frame should be JSON")
    }
}

pub(crate) struct MockChannel {
    inbound: mpsc::UnboundedReceiver<TransportEvent>,
    outbound: mpsc::UnboundedSender<String>,
    closes: Arc<AtomicUsize>,
}

impl FrameChannel for MockChannel {
    async fn send_text(&mut self, text: String) -> Result<(), ConnectionError> {
        self.outbound
            .send(text)
            .map_err(|_| ConnectionError::Transport {
                message: String::from("mock server gone"),
                location: ErrorLocation::from(Location::caller()),
            })
    }

    async fn next_event(&mut self) -> TransportEvent {
        self.inbound
            .recv()
            .await
            .unwrap_or(TransportEvent::Closed {
                code: None,
                reason: String::from("mock server dropped"),
            })
    }

    async fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

pub(crate) struct MockConnector {
    script: Arc<Mutex<Script>>,
    servers: mpsc::UnboundedSender<MockServer>,
}

/// Test-side view of a [`MockConnector`].
pub(crate) struct ConnectorRecorder {
    script: Arc<Mutex<Script>>,
    servers: mpsc::UnboundedReceiver<MockServer>,
}

/// A connector that plays `outcomes` in order, then accepts everything.
pub(crate) fn mock_connector(
    outcomes: impl IntoIterator<Item = Outcome>,
) -> (MockConnector, ConnectorRecorder) {
    let script = Arc::new(Mutex::new(Script {
        outcomes: outcomes.into_iter().collect(),
        attempts: Vec::new(),
    }));
    let (servers_tx, servers_rx) = mpsc::unbounded_channel();

    (
        MockConnector {
            script: Arc::clone(&script),
            servers: servers_tx,
        },
        ConnectorRecorder {
            script,
            servers: servers_rx,
        },
    )
}

impl Connector for MockConnector {
    type Channel = MockChannel;

    async fn connect(&self, address: &Url) -> Result<MockChannel, ConnectionError> {
        let outcome = {
            let mut script = self.script.lock().expect("script lock");
            script.attempts.push((address.clone(), Instant::now()));
            script.outcomes.pop_front().unwrap_or(Outcome::Accept)
        };

        match outcome {
            Outcome::Accept => {
                let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
                let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
                let closes = Arc::new(AtomicUsize::new(0));
                let _ = self.servers.send(MockServer {
                    inbound: inbound_tx,
                    outbound: outbound_rx,
                    closes: Arc::clone(&closes),
                });
                Ok(MockChannel {
                    inbound: inbound_rx,
                    outbound: outbound_tx,
                    closes,
                })
            }
            Outcome::Reject(status) => Err(ConnectionError::Rejected {
                status: HttpStatusCode(status),
                location: ErrorLocation::from(Location::caller()),
            }),
            Outcome::Fail => Err(ConnectionError::Handshake {
                message: String::from("connection refused"),
                location: ErrorLocation::from(Location::caller()),
            }),
            Outcome::Hang => std::future::pending().await,
        }
    }
}

impl ConnectorRecorder {
    pub fn attempts(&self) -> Vec<(Url, Instant)> {
        self.script.lock().expect("script lock").attempts.clone()
    }

    pub fn attempt_count(&self) -> usize {
        self.script.lock().expect("script lock").attempts.len()
    }

    pub async fn next_server(&mut self) -> MockServer {
        tokio::time::timeout(WAIT_LIMIT, self.servers.recv())
            .await
            .expect("timed out waiting for a connection")
            .expect("connector dropped")
    }
}

// ============================================
// CREDENTIAL SOURCE
// ============================================

/// Provider whose refresh results are scripted. A successful refresh also
/// becomes the current credential, as a real login flow would do.
pub(crate) struct ScriptedProvider {
    current: Mutex<Option<SessionCredential>>,
    refreshes: Mutex<VecDeque<Option<&'static str>>>,
    pub refresh_calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(
        credential: Option<SessionCredential>,
        refreshes: impl IntoIterator<Item = Option<&'static str>>,
    ) -> Self {
        Self {
            current: Mutex::new(credential),
            refreshes: Mutex::new(refreshes.into_iter().collect()),
            refresh_calls: AtomicUsize::new(0),
        }
    }

    pub fn set(&self, credential: SessionCredential) {
        *self.current.lock().expect("provider lock") = Some(credential);
    }
}

impl AuthSessionProvider for ScriptedProvider {
    fn credential(&self) -> Option<SessionCredential> {
        self.current.lock().expect("provider lock").clone()
    }

    async fn refresh(&self) -> Result<RedactedToken, AuthError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .refreshes
            .lock()
            .expect("provider lock")
            .pop_front()
            .flatten();

        match next {
            Some(token) => {
                let mut current = self.current.lock().expect("provider lock");
                let session_id = current.as_ref().and_then(|c| c.session_id.clone());
                *current = Some(SessionCredential::new(RedactedToken::new(token), session_id));
                Ok(RedactedToken::new(token))
            }
            None => Err(AuthError::RefreshDenied {
                message: String::from("login expired"),
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }
}

// ============================================
// MICROPHONE
// ============================================

#[derive(Debug, Default)]
pub(crate) struct DeviceCounters {
    pub acquired: AtomicUsize,
    pub released: AtomicUsize,
}

impl DeviceCounters {
    /// Handles acquired and not yet released.
    pub fn live(&self) -> usize {
        self.acquired.load(Ordering::SeqCst) - self.released.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct DeviceBehavior {
    pub deny: bool,
    pub fail_start: bool,
    pub fail_stop: bool,
    /// Delivered half on start, the rest on stop.
    pub chunks: Vec<Vec<u8>>,
}

pub(crate) struct MockDevice {
    pub counters: Arc<DeviceCounters>,
    behavior: DeviceBehavior,
}

impl MockDevice {
    pub fn new(behavior: DeviceBehavior) -> Self {
        Self {
            counters: Arc::new(DeviceCounters::default()),
            behavior,
        }
    }
}

pub(crate) struct MockHandle {
    counters: Arc<DeviceCounters>,
    behavior: DeviceBehavior,
    sink: Option<ChunkSink>,
}

impl AudioDevice for MockDevice {
    type Handle = MockHandle;

    async fn acquire(&self) -> Result<MockHandle, CaptureError> {
        if self.behavior.deny {
            return Err(CaptureError::DeviceUnavailable {
                message: String::from("permission denied"),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        self.counters.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(MockHandle {
            counters: Arc::clone(&self.counters),
            behavior: self.behavior.clone(),
            sink: None,
        })
    }
}

impl MediaHandle for MockHandle {
    fn mime_type(&self) -> &str {
        "audio/wav"
    }

    fn start(&mut self, sink: ChunkSink) -> Result<(), CaptureError> {
        if self.behavior.fail_start {
            return Err(CaptureError::Device {
                message: String::from("device busy"),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        let half = self.behavior.chunks.len() / 2;
        for chunk in &self.behavior.chunks[..half] {
            sink.push(chunk.clone());
        }
        self.sink = Some(sink);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        let half = self.behavior.chunks.len() / 2;
        if let Some(sink) = &self.sink {
            for chunk in &self.behavior.chunks[half..] {
                sink.push(chunk.clone());
            }
        }
        if self.behavior.fail_stop {
            return Err(CaptureError::Device {
                message: String::from("device unplugged"),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        Ok(())
    }

    fn release(&mut self) {
        self.sink = None;
        self.counters.released.fetch_add(1, Ordering::SeqCst);
    }
}
