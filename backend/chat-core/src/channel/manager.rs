//! Connection manager actor.
//!
//! One spawned task owns the channel and every piece of lifecycle state.
//! Callers talk to it through a cloneable [`ConnectionManager`] handle:
//!
//! - commands (connect, disconnect, send, shutdown) go over an unbounded mpsc queue
//! - the current [`ChannelStatus`] is published on a `watch` channel for cheap reads
//! - named observer lists report state changes and terminal failures
//!
//! ```text
//! Idle ──connect──▶ Connecting ──ok──▶ Open ──disconnect──▶ Closing ──▶ Idle
//!                      │                 │
//!                      └──fail──▶ Reconnecting ◀──drop──┘
//!                                   │      ▲
//!                                   └timer─┘ (via Connecting)
//! ```
//!
//! Each phase waits on its own event source plus the command queue with
//! `tokio::select!`, so there is exactly one reconnect timer and at most one
//! handshake in flight. Dropping the phase drops both.

use crate::AUTH_REJECTED_CLOSE_CODE;
use crate::auth::AuthSessionProvider;
use crate::channel::address::{channel_address, redacted_address};
use crate::channel::reconnect::ReconnectState;
use crate::channel::transport::{Connector, FrameChannel, TransportEvent};
use crate::config::{ChannelConfig, ReconnectPolicy};
use crate::dispatch::Dispatcher;
use crate::error::connection::ConnectionError;
use crate::error::dispatch::DecodeError;
use crate::observers::{Observers, SubscriptionId};

use common::ErrorLocation;
use models::{OutboundFrame, SessionCredential};

use std::fmt;
use std::future::Future;
use std::panic::Location;
use std::pin::Pin;
use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Instant, Interval, MissedTickBehavior, Sleep};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Idle,
    Connecting,
    Open,
    Reconnecting,
    Closing,
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ChannelState::Idle => "idle",
            ChannelState::Connecting => "connecting",
            ChannelState::Open => "open",
            ChannelState::Reconnecting => "reconnecting",
            ChannelState::Closing => "closing",
        };
        f.write_str(label)
    }
}

/// Lifecycle state plus the backoff counters that go with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelStatus {
    pub state: ChannelState,
    pub reconnect: ReconnectState,
}

#[derive(Default)]
struct ConnectionObservers {
    state_change: Observers<ChannelStatus>,
    decode_error: Observers<DecodeError>,
    reconnect_exhausted: Observers<ConnectionError>,
    refresh_denied: Observers<ConnectionError>,
}

enum Command {
    Connect {
        credential: Option<SessionCredential>,
        reply: oneshot::Sender<Result<(), ConnectionError>>,
    },
    Disconnect {
        reply: oneshot::Sender<()>,
    },
    Send(OutboundFrame),
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Handle to the connection actor. Cheap to clone; all clones drive the same channel.
///
/// The actor stops when [`ConnectionManager::shutdown`] is called or the last
/// handle is dropped.
#[derive(Clone)]
pub struct ConnectionManager {
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<ChannelStatus>,
    observers: Arc<ConnectionObservers>,
}

impl ConnectionManager {
    /// Spawn the actor on the current tokio runtime.
    pub fn spawn<C, P>(
        config: ChannelConfig,
        policy: ReconnectPolicy,
        connector: C,
        provider: Arc<P>,
        dispatcher: Dispatcher,
    ) -> Self
    where
        C: Connector,
        P: AuthSessionProvider,
    {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let reconnect = ReconnectState::initial(&policy);
        let (status_tx, status_rx) = watch::channel(ChannelStatus {
            state: ChannelState::Idle,
            reconnect,
        });
        let observers = Arc::new(ConnectionObservers::default());

        let actor = ConnectionActor {
            config,
            policy,
            connector: Arc::new(connector),
            provider,
            dispatcher,
            observers: Arc::clone(&observers),
            status: status_tx,
            commands: command_rx,
            reconnect,
            pinned: None,
        };
        tokio::spawn(actor.run());

        Self {
            commands: command_tx,
            status: status_rx,
            observers,
        }
    }

    /// Open the channel with the provider's current credential.
    ///
    /// Resolves once the first handshake succeeds or fails. A failed first
    /// handshake is returned here while the manager keeps retrying in the
    /// background.
    ///
    /// # Errors
    ///
    /// - [`ConnectionError::MissingCredential`] if there is no usable token (manager stays idle)
    /// - [`ConnectionError::InvalidState`] if the manager is not idle
    /// - the handshake failure of the first attempt
    pub async fn connect(&self) -> Result<(), ConnectionError> {
        self.request_connect(None).await
    }

    /// Open the channel with an explicit credential.
    ///
    /// Retries still prefer the provider's current credential and fall back
    /// to this one.
    pub async fn connect_with(&self, credential: SessionCredential) -> Result<(), ConnectionError> {
        self.request_connect(Some(credential)).await
    }

    /// Close the channel and cancel any pending reconnect. No-op while idle.
    pub async fn disconnect(&self) -> Result<(), ConnectionError> {
        let (reply, done) = oneshot::channel();
        self.command(Command::Disconnect { reply })?;
        done.await.map_err(|_| actor_stopped())
    }

    /// Close the channel and stop the actor. Later calls fail with `ActorStopped`.
    pub async fn shutdown(&self) -> Result<(), ConnectionError> {
        let (reply, done) = oneshot::channel();
        self.command(Command::Shutdown { reply })?;
        done.await.map_err(|_| actor_stopped())
    }

    /// Queue a frame for transmission. Never suspends.
    ///
    /// Frames are written in call order. A frame accepted here is lost if the
    /// channel drops before the actor writes it; that loss is logged.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::ChannelNotOpen`] unless the channel is open.
    #[track_caller]
    pub fn send(&self, frame: OutboundFrame) -> Result<(), ConnectionError> {
        let state = self.state();
        if state != ChannelState::Open {
            return Err(ConnectionError::ChannelNotOpen {
                state: state.to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        self.command(Command::Send(frame))
    }

    #[track_caller]
    pub fn send_text(&self, content: impl Into<String>) -> Result<(), ConnectionError> {
        self.send(OutboundFrame::text(content))
    }

    pub fn status(&self) -> ChannelStatus {
        *self.status.borrow()
    }

    pub fn state(&self) -> ChannelState {
        self.status.borrow().state
    }

    /// A receiver that wakes on every status change.
    pub fn watch_status(&self) -> watch::Receiver<ChannelStatus> {
        self.status.clone()
    }

    pub fn on_state_change<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&ChannelStatus) + Send + Sync + 'static,
    {
        self.observers.state_change.subscribe(observer)
    }

    pub fn on_decode_error<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&DecodeError) + Send + Sync + 'static,
    {
        self.observers.decode_error.subscribe(observer)
    }

    pub fn on_reconnect_exhausted<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&ConnectionError) + Send + Sync + 'static,
    {
        self.observers.reconnect_exhausted.subscribe(observer)
    }

    pub fn on_refresh_denied<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&ConnectionError) + Send + Sync + 'static,
    {
        self.observers.refresh_denied.subscribe(observer)
    }

    /// Remove a subscription from whichever list holds it.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let observers = &self.observers;
        observers.state_change.unsubscribe(id)
            || observers.decode_error.unsubscribe(id)
            || observers.reconnect_exhausted.unsubscribe(id)
            || observers.refresh_denied.unsubscribe(id)
    }

    async fn request_connect(
        &self,
        credential: Option<SessionCredential>,
    ) -> Result<(), ConnectionError> {
        let (reply, outcome) = oneshot::channel();
        self.command(Command::Connect { credential, reply })?;
        outcome.await.map_err(|_| actor_stopped())?
    }

    #[track_caller]
    fn command(&self, command: Command) -> Result<(), ConnectionError> {
        self.commands.send(command).map_err(|_| actor_stopped())
    }
}

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("status", &self.status())
            .finish()
    }
}

#[track_caller]
fn actor_stopped() -> ConnectionError {
    ConnectionError::ActorStopped {
        message: String::from("Connection actor is no longer running"),
        location: ErrorLocation::from(Location::caller()),
    }
}

#[track_caller]
fn cancelled() -> ConnectionError {
    ConnectionError::Cancelled {
        message: String::from("Connect abandoned by disconnect"),
        location: ErrorLocation::from(Location::caller()),
    }
}

// ============================================
// ACTOR
// ============================================

struct Connected<Ch> {
    channel: Ch,
    credential: SessionCredential,
}

type Attempt<Ch> = Pin<Box<dyn Future<Output = Result<Connected<Ch>, ConnectionError>> + Send>>;
type ConnectReply = oneshot::Sender<Result<(), ConnectionError>>;

enum Phase<Ch> {
    Idle,
    Connecting {
        attempt: Attempt<Ch>,
        waiter: Option<ConnectReply>,
    },
    Open {
        channel: Ch,
        session_id: Option<String>,
        heartbeat: Interval,
    },
    Reconnecting {
        timer: Pin<Box<Sleep>>,
        refresh: bool,
    },
    Stopped,
}

struct ConnectionActor<C: Connector, P> {
    config: ChannelConfig,
    policy: ReconnectPolicy,
    connector: Arc<C>,
    provider: Arc<P>,
    dispatcher: Dispatcher,
    observers: Arc<ConnectionObservers>,
    status: watch::Sender<ChannelStatus>,
    commands: mpsc::UnboundedReceiver<Command>,
    reconnect: ReconnectState,
    /// Credential passed to `connect_with`, used when the provider has none.
    pinned: Option<SessionCredential>,
}

impl<C, P> ConnectionActor<C, P>
where
    C: Connector,
    P: AuthSessionProvider,
{
    async fn run(mut self) {
        debug!("Connection actor started");

        let mut phase = Phase::Idle;
        loop {
            phase = match phase {
                Phase::Idle => self.idle().await,
                Phase::Connecting { attempt, waiter } => self.connecting(attempt, waiter).await,
                Phase::Open {
                    channel,
                    session_id,
                    heartbeat,
                } => self.open(channel, session_id, heartbeat).await,
                Phase::Reconnecting { timer, refresh } => self.reconnecting(timer, refresh).await,
                Phase::Stopped => break,
            };
        }

        self.set_state(ChannelState::Idle);
        debug!("Connection actor stopped");
    }

    async fn idle(&mut self) -> Phase<C::Channel> {
        match self.commands.recv().await {
            Some(Command::Connect { credential, reply }) => self.begin_connect(credential, reply),
            Some(Command::Disconnect { reply }) => {
                debug!("Disconnect while idle ignored");
                let _ = reply.send(());
                Phase::Idle
            }
            Some(Command::Send(_)) => {
                warn!("Dropping outbound frame: channel is idle");
                Phase::Idle
            }
            Some(Command::Shutdown { reply }) => {
                let _ = reply.send(());
                Phase::Stopped
            }
            None => Phase::Stopped,
        }
    }

    fn begin_connect(
        &mut self,
        explicit: Option<SessionCredential>,
        reply: ConnectReply,
    ) -> Phase<C::Channel> {
        self.pinned = explicit.clone();
        let credential = explicit
            .or_else(|| self.provider.credential())
            .filter(SessionCredential::has_token);

        let Some(credential) = credential else {
            let _ = reply.send(Err(ConnectionError::MissingCredential {
                message: String::from("No session token available"),
                location: ErrorLocation::from(Location::caller()),
            }));
            return Phase::Idle;
        };

        self.reconnect = ReconnectState::initial(&self.policy);
        self.set_state(ChannelState::Connecting);
        Phase::Connecting {
            attempt: self.start_attempt(Some(credential), false),
            waiter: Some(reply),
        }
    }

    async fn connecting(
        &mut self,
        mut attempt: Attempt<C::Channel>,
        waiter: Option<ConnectReply>,
    ) -> Phase<C::Channel> {
        tokio::select! {
            result = &mut attempt => match result {
                Ok(Connected { channel, credential }) => {
                    if self.pinned.is_some() {
                        self.pinned = Some(credential.clone());
                    }
                    self.reconnect = ReconnectState::initial(&self.policy);
                    self.set_state(ChannelState::Open);
                    info!(
                        "Channel open (session: {})",
                        credential.session_id.as_deref().unwrap_or("none")
                    );
                    if let Some(waiter) = waiter {
                        let _ = waiter.send(Ok(()));
                    }
                    Phase::Open {
                        channel,
                        session_id: credential.session_id,
                        heartbeat: self.heartbeat(),
                    }
                }
                Err(e) => {
                    let next = self.after_failed_attempt(&e);
                    match waiter {
                        Some(waiter) => {
                            let _ = waiter.send(Err(e));
                        }
                        None => warn!("Reconnect attempt failed: {e}"),
                    }
                    next
                }
            },
            command = self.commands.recv() => match command {
                Some(Command::Connect { reply, .. }) => {
                    let _ = reply.send(Err(self.invalid_state("Connect already in progress")));
                    Phase::Connecting { attempt, waiter }
                }
                Some(Command::Send(_)) => {
                    warn!("Dropping outbound frame: channel is still connecting");
                    Phase::Connecting { attempt, waiter }
                }
                Some(Command::Disconnect { reply }) => {
                    drop(attempt);
                    if let Some(waiter) = waiter {
                        let _ = waiter.send(Err(cancelled()));
                    }
                    self.close_idle();
                    let _ = reply.send(());
                    Phase::Idle
                }
                Some(Command::Shutdown { reply }) => {
                    if let Some(waiter) = waiter {
                        let _ = waiter.send(Err(cancelled()));
                    }
                    let _ = reply.send(());
                    Phase::Stopped
                }
                None => Phase::Stopped,
            },
        }
    }

    async fn open(
        &mut self,
        mut channel: C::Channel,
        session_id: Option<String>,
        mut heartbeat: Interval,
    ) -> Phase<C::Channel> {
        tokio::select! {
            event = channel.next_event() => match event {
                TransportEvent::Frame(text) => {
                    self.dispatch(&text);
                    Phase::Open { channel, session_id, heartbeat }
                }
                TransportEvent::Closed { code, reason } => {
                    let rejected = code == Some(AUTH_REJECTED_CLOSE_CODE);
                    if rejected {
                        warn!("Server rejected the session ({reason}), token will be refreshed");
                    } else {
                        warn!("Channel closed by peer (code: {code:?}, reason: {reason})");
                    }
                    self.schedule_retry(rejected)
                }
                TransportEvent::Error(message) => {
                    warn!("Channel transport error: {message}");
                    self.schedule_retry(false)
                }
            },
            _ = heartbeat.tick() => {
                let frame = OutboundFrame::heartbeat(session_id.clone());
                match write_frame(&mut channel, frame).await {
                    Ok(()) => Phase::Open { channel, session_id, heartbeat },
                    Err(e) => {
                        warn!("Heartbeat failed: {e}");
                        self.schedule_retry(false)
                    }
                }
            },
            command = self.commands.recv() => match command {
                Some(Command::Send(frame)) => {
                    let frame = frame.with_default_session(session_id.as_deref());
                    match write_frame(&mut channel, frame).await {
                        Ok(()) => Phase::Open { channel, session_id, heartbeat },
                        Err(e) => {
                            warn!("Outbound frame lost, channel dropped mid-flight: {e}");
                            self.schedule_retry(false)
                        }
                    }
                }
                Some(Command::Connect { reply, .. }) => {
                    let _ = reply.send(Err(self.invalid_state("Channel is already open")));
                    Phase::Open { channel, session_id, heartbeat }
                }
                Some(Command::Disconnect { reply }) => {
                    self.set_state(ChannelState::Closing);
                    channel.close().await;
                    self.set_state(ChannelState::Idle);
                    info!("Channel closed");
                    let _ = reply.send(());
                    Phase::Idle
                }
                Some(Command::Shutdown { reply }) => {
                    self.set_state(ChannelState::Closing);
                    channel.close().await;
                    let _ = reply.send(());
                    Phase::Stopped
                }
                None => {
                    channel.close().await;
                    Phase::Stopped
                }
            },
        }
    }

    async fn reconnecting(
        &mut self,
        mut timer: Pin<Box<Sleep>>,
        refresh: bool,
    ) -> Phase<C::Channel> {
        tokio::select! {
            () = &mut timer => {
                let credential = self
                    .provider
                    .credential()
                    .filter(SessionCredential::has_token)
                    .or_else(|| self.pinned.clone());
                info!(
                    "Reconnect attempt {}/{}",
                    self.reconnect.attempt, self.policy.max_attempts
                );
                self.set_state(ChannelState::Connecting);
                Phase::Connecting {
                    attempt: self.start_attempt(credential, refresh),
                    waiter: None,
                }
            },
            command = self.commands.recv() => match command {
                Some(Command::Connect { reply, .. }) => {
                    let _ = reply.send(Err(self.invalid_state("Reconnect already scheduled")));
                    Phase::Reconnecting { timer, refresh }
                }
                Some(Command::Send(_)) => {
                    warn!("Dropping outbound frame: channel is reconnecting");
                    Phase::Reconnecting { timer, refresh }
                }
                Some(Command::Disconnect { reply }) => {
                    drop(timer);
                    self.close_idle();
                    let _ = reply.send(());
                    Phase::Idle
                }
                Some(Command::Shutdown { reply }) => {
                    let _ = reply.send(());
                    Phase::Stopped
                }
                None => Phase::Stopped,
            },
        }
    }

    fn start_attempt(
        &self,
        credential: Option<SessionCredential>,
        refresh: bool,
    ) -> Attempt<C::Channel> {
        Box::pin(attempt_handshake(
            Arc::clone(&self.connector),
            Arc::clone(&self.provider),
            self.config.clone(),
            credential,
            refresh,
        ))
    }

    fn after_failed_attempt(&mut self, error: &ConnectionError) -> Phase<C::Channel> {
        if let ConnectionError::RefreshDenied { message, .. } = error {
            error!("Token refresh denied, giving up: {message}");
            self.set_state(ChannelState::Idle);
            self.observers
                .refresh_denied
                .notify(&ConnectionError::RefreshDenied {
                    message: message.clone(),
                    location: ErrorLocation::from(Location::caller()),
                });
            return Phase::Idle;
        }

        let refresh = error.is_auth_rejection()
            || matches!(error, ConnectionError::MissingCredential { .. });
        self.schedule_retry(refresh)
    }

    fn schedule_retry(&mut self, refresh: bool) -> Phase<C::Channel> {
        match self.reconnect.advance(&self.policy) {
            Some(next) => {
                self.reconnect = next;
                self.set_state(ChannelState::Reconnecting);
                info!(
                    "Reconnecting in {}ms (attempt {}/{})",
                    next.next_delay.as_millis(),
                    next.attempt,
                    self.policy.max_attempts
                );
                Phase::Reconnecting {
                    timer: Box::pin(tokio::time::sleep(next.next_delay)),
                    refresh,
                }
            }
            None => {
                let attempts = self.reconnect.attempt;
                error!("Reconnect gave up after {attempts} attempts");
                self.set_state(ChannelState::Idle);
                self.observers
                    .reconnect_exhausted
                    .notify(&ConnectionError::ReconnectExhausted {
                        attempts,
                        location: ErrorLocation::from(Location::caller()),
                    });
                Phase::Idle
            }
        }
    }

    fn close_idle(&mut self) {
        self.set_state(ChannelState::Closing);
        self.set_state(ChannelState::Idle);
        info!("Channel closed, pending reconnect cancelled");
    }

    fn dispatch(&self, text: &str) {
        if let Err(e) = self.dispatcher.dispatch(text) {
            warn!("Skipping inbound frame: {e}");
            self.observers.decode_error.notify(&e);
        }
    }

    fn heartbeat(&self) -> Interval {
        let period = self.config.heartbeat_interval();
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    }

    fn invalid_state(&self, message: &str) -> ConnectionError {
        ConnectionError::InvalidState {
            state: self.status.borrow().state.to_string(),
            message: message.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    fn set_state(&self, state: ChannelState) {
        let status = ChannelStatus {
            state,
            reconnect: self.reconnect,
        };
        let changed = self.status.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            *current = status;
            true
        });
        if changed {
            debug!("Channel state -> {state} (attempt {})", status.reconnect.attempt);
            self.observers.state_change.notify(&status);
        }
    }
}

async fn write_frame<Ch: FrameChannel>(
    channel: &mut Ch,
    frame: OutboundFrame,
) -> Result<(), ConnectionError> {
    let text = serde_json::to_string(&frame).map_err(|e| ConnectionError::Transport {
        message: format!("Failed to encode frame: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })?;
    channel.send_text(text).await
}

/// One full handshake: optional token refresh, address, connect with timeout.
async fn attempt_handshake<C, P>(
    connector: Arc<C>,
    provider: Arc<P>,
    config: ChannelConfig,
    credential: Option<SessionCredential>,
    refresh: bool,
) -> Result<Connected<C::Channel>, ConnectionError>
where
    C: Connector,
    P: AuthSessionProvider,
{
    let credential = match credential {
        Some(credential) if !refresh => credential,
        previous => {
            debug!("Refreshing session token before handshake");
            let token = provider.refresh().await?;
            let session_id = provider
                .credential()
                .and_then(|current| current.session_id)
                .or_else(|| previous.and_then(|p| p.session_id));
            SessionCredential::new(token, session_id)
        }
    };

    let address = channel_address(&config, &credential)?;
    info!("Connecting to {}", redacted_address(&address));

    let channel = tokio::time::timeout(config.handshake_timeout(), connector.connect(&address))
        .await
        .map_err(|_| ConnectionError::Timeout {
            message: format!(
                "Handshake did not complete within {}ms",
                config.handshake_timeout_ms
            ),
            location: ErrorLocation::from(Location::caller()),
        })??;

    Ok(Connected {
        channel,
        credential,
    })
}
