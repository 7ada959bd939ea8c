//! User Stream Lifecycle Manager
//!
//! Owns the authenticated user data feed: acquire a session token, open the
//! connection, refresh the token on a fixed interval, and rebuild everything
//! with exponential backoff when acquisition or refresh fails.
//!
//! # States
//!
//! ```text
//!                 ┌──────────────── failure ───────────────┐
//!                 ▼                                        │
//! AcquiringToken ──ok──► Connected (refresh every 30m) ──fail──► ReconnectWait
//!       ▲                                                       │
//!       └──────────────────── backoff elapsed ──────────────────┘
//!
//! any state ──close()──► Closing ──► Closed
//! ```
//!
//! One spawned task drives the loop. Every wait (acquisition, refresh
//! interval, refresh call, backoff sleep) is raced against a cancellation
//! token with `biased` selection, so after [`UserStreamHandle::close`]
//! returns no refresh or reconnect can start.
//!
//! Close and error notifications from the connection are logged only.
//! Reconnection is driven by acquisition and refresh failures.
//!
//! The backoff resets when the first refresh on a new connection succeeds,
//! not when the connection opens. A token that is issued but never
//! refreshes keeps doubling the wait.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::oneshot;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::reconnect::{ReconnectConfig, ReconnectPolicy};
use crate::application::ports::{
    CLOSE_HANDLE_REASON, CloseOptions, ConnectionHandlers, NORMAL_CLOSURE, SessionPort,
    StreamConnection, StreamConnector,
};
use crate::domain::codec::JsonCodec;
use crate::domain::events::UserEvent;
use crate::domain::subscription::{DEFAULT_BASE_URL, user_stream_address};

/// Interval between session refreshes.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// First reconnect delay, doubled after every failed attempt.
pub const DEFAULT_RECONNECT_BASE: Duration = Duration::from_millis(2000);

// =============================================================================
// Configuration
// =============================================================================

/// User stream timing and addressing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserStreamConfig {
    /// Streaming base address; the session token is appended to it.
    pub base_url: String,
    /// Interval between session refreshes.
    pub refresh_interval: Duration,
    /// Reconnect backoff base.
    pub reconnect_base: Duration,
}

impl Default for UserStreamConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            reconnect_base: DEFAULT_RECONNECT_BASE,
        }
    }
}

impl UserStreamConfig {
    /// Default timings under a custom base address.
    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }
}

// =============================================================================
// State
// =============================================================================

/// Lifecycle state of one user stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserStreamState {
    /// Requesting a session token.
    AcquiringToken,
    /// Connection open, session refreshed periodically.
    Connected,
    /// Waiting out the backoff before the next acquisition.
    ReconnectWait,
    /// Close requested, connection being closed.
    Closing,
    /// Closed for good.
    Closed,
}

impl UserStreamState {
    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AcquiringToken => "acquiring_token",
            Self::Connected => "connected",
            Self::ReconnectWait => "reconnect_wait",
            Self::Closing => "closing",
            Self::Closed => "closed",
        }
    }

    const fn is_terminal(self) -> bool {
        matches!(self, Self::Closing | Self::Closed)
    }
}

impl fmt::Display for UserStreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State shared between the driving task and the handles.
struct Shared {
    correlation_id: String,
    span: tracing::Span,
    state: RwLock<UserStreamState>,
    connection: Mutex<Option<Arc<dyn StreamConnection>>>,
    cancel: CancellationToken,
}

impl Shared {
    fn new(correlation_id: String) -> Self {
        let span = tracing::info_span!("user_stream", correlation_id = %correlation_id);
        Self {
            correlation_id,
            span,
            state: RwLock::new(UserStreamState::AcquiringToken),
            connection: Mutex::new(None),
            cancel: CancellationToken::new(),
        }
    }

    fn state(&self) -> UserStreamState {
        *self.state.read()
    }

    /// Move to `next` unless a close already happened.
    fn set_state(&self, next: UserStreamState) {
        let mut state = self.state.write();
        if !state.is_terminal() {
            *state = next;
        }
    }

    /// Store a freshly opened connection, or close it if the stream was
    /// closed while it was being opened.
    fn install(&self, connection: Arc<dyn StreamConnection>) -> bool {
        let mut slot = self.connection.lock();
        if self.cancel.is_cancelled() {
            drop(slot);
            close_connection(connection.as_ref(), CloseOptions::new());
            return false;
        }
        if let Some(previous) = slot.replace(connection) {
            close_connection(previous.as_ref(), CloseOptions::new());
        }
        true
    }

    /// Close the active connection without ending the lifecycle.
    fn teardown(&self) {
        let connection = self.connection.lock().take();
        if let Some(connection) = connection {
            close_connection(connection.as_ref(), CloseOptions::new());
        }
    }

    /// End the lifecycle: cancel every pending wait, then close the connection.
    fn close(&self, options: CloseOptions) {
        let _entered = self.span.enter();
        tracing::info!("Closing user data stream");

        self.set_state(UserStreamState::Closing);
        self.cancel.cancel();

        let connection = self.connection.lock().take();
        if let Some(connection) = connection {
            close_connection(connection.as_ref(), options);
        }

        *self.state.write() = UserStreamState::Closed;
    }
}

fn close_connection(connection: &dyn StreamConnection, options: CloseOptions) {
    connection.close(NORMAL_CLOSURE, CLOSE_HANDLE_REASON, &options.with_keep_closed());
}

// =============================================================================
// Handle
// =============================================================================

/// Caller-facing control of a running user stream.
///
/// The stream keeps running when every handle is dropped, but only a
/// handle can close it.
#[derive(Clone)]
#[must_use = "the user stream can only be closed through its handle"]
pub struct UserStreamHandle {
    shared: Arc<Shared>,
}

impl UserStreamHandle {
    /// Stop the stream for good.
    ///
    /// Cancels the refresh interval and any reconnect wait, then closes the
    /// connection with code 1000 and `keep_closed` forced on. Safe to call
    /// more than once.
    pub fn close(&self, options: CloseOptions) {
        self.shared.close(options);
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> UserStreamState {
        self.shared.state()
    }

    /// Correlation identifier tagged on every log line of this stream.
    #[must_use]
    pub fn correlation_id(&self) -> &str {
        &self.shared.correlation_id
    }
}

impl fmt::Debug for UserStreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserStreamHandle")
            .field("correlation_id", &self.shared.correlation_id)
            .field("state", &self.shared.state())
            .finish()
    }
}

// =============================================================================
// Manager
// =============================================================================

enum Establish {
    Connected(String),
    Failed,
    Cancelled,
}

enum KeepAlive {
    Failed,
    Cancelled,
}

/// Drives one user data stream through its lifecycle.
pub struct UserStreamManager {
    config: UserStreamConfig,
    connector: Arc<dyn StreamConnector>,
    session: Arc<dyn SessionPort>,
    handlers: ConnectionHandlers,
    backoff: ReconnectPolicy,
    shared: Arc<Shared>,
}

impl UserStreamManager {
    /// Create a manager delivering user events to `callback`.
    pub fn new<C>(
        config: UserStreamConfig,
        connector: Arc<dyn StreamConnector>,
        session: Arc<dyn SessionPort>,
        correlation_id: impl Into<String>,
        callback: C,
    ) -> Self
    where
        C: Fn(UserEvent) + Send + Sync + 'static,
    {
        let shared = Arc::new(Shared::new(correlation_id.into()));
        let handlers = Self::handlers(&shared.span, callback);
        let backoff = ReconnectPolicy::new(ReconnectConfig::unbounded(config.reconnect_base));

        Self {
            config,
            connector,
            session,
            handlers,
            backoff,
            shared,
        }
    }

    fn handlers<C>(span: &tracing::Span, callback: C) -> ConnectionHandlers
    where
        C: Fn(UserEvent) + Send + Sync + 'static,
    {
        let codec = JsonCodec::new();
        let (message_span, close_span, error_span) = (span.clone(), span.clone(), span.clone());

        ConnectionHandlers::new(move |text| match codec.decode_user_event(text) {
            Ok(event) => callback(event),
            Err(e) => {
                let _entered = message_span.enter();
                tracing::warn!(error = %e, "Dropping undecodable user event");
            }
        })
        .on_close(move |event| {
            let _entered = close_span.enter();
            tracing::info!(code = event.code, reason = %event.reason, "User connection closed");
        })
        .on_error(move |error| {
            let _entered = error_span.enter();
            tracing::warn!(error = %error, "User connection error");
        })
    }

    /// A handle to this stream. Usable before the first connection.
    pub fn handle(&self) -> UserStreamHandle {
        UserStreamHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Spawn the lifecycle task on the current tokio runtime.
    ///
    /// The receiver resolves once the first connection is open. Dropping it
    /// before then makes the stream close itself.
    #[must_use]
    pub fn spawn(self) -> oneshot::Receiver<UserStreamHandle> {
        let (ready_tx, ready_rx) = oneshot::channel();
        tokio::spawn(self.run(ready_tx));
        ready_rx
    }

    /// Run the lifecycle until the stream is closed.
    pub async fn run(self, ready: oneshot::Sender<UserStreamHandle>) {
        let span = self.shared.span.clone();
        self.drive(ready).instrument(span).await;
    }

    async fn drive(mut self, ready: oneshot::Sender<UserStreamHandle>) {
        let mut ready = Some(ready);

        loop {
            if ready.as_ref().is_some_and(oneshot::Sender::is_closed) {
                tracing::warn!("User stream subscriber went away before the first connection");
                self.shared.close(CloseOptions::new());
                break;
            }

            match self.establish().await {
                Establish::Cancelled => break,
                Establish::Failed => {}
                Establish::Connected(listen_key) => {
                    let delivered = ready.take().is_none_or(|tx| tx.send(self.handle()).is_ok());
                    if !delivered {
                        tracing::warn!(
                            "User stream subscriber went away before the first connection"
                        );
                        self.shared.close(CloseOptions::new());
                        break;
                    }

                    match self.keep_alive(&listen_key).await {
                        KeepAlive::Cancelled => break,
                        KeepAlive::Failed => self.shared.teardown(),
                    }
                }
            }

            if !self.wait_before_reconnect().await {
                break;
            }
        }

        if !self.shared.cancel.is_cancelled() {
            self.shared.close(CloseOptions::new());
        }
        tracing::debug!("User stream task finished");
    }

    async fn establish(&self) -> Establish {
        self.shared.set_state(UserStreamState::AcquiringToken);
        tracing::info!(base_url = %self.config.base_url, "Acquiring user data stream session");

        let result = tokio::select! {
            biased;
            () = self.shared.cancel.cancelled() => return Establish::Cancelled,
            result = self.session.get_data_stream() => result,
        };

        let stream = match result {
            Ok(stream) => stream,
            Err(e) => {
                tracing::error!(error = %e, "Failed to acquire user data stream session");
                return Establish::Failed;
            }
        };

        tracing::info!(listen_key = %stream.listen_key, "Received user data stream session");

        let address = user_stream_address(&self.config.base_url, &stream.listen_key);
        let connection = self.connector.open(&address, self.handlers.clone());
        if !self.shared.install(connection) {
            return Establish::Cancelled;
        }

        self.shared.set_state(UserStreamState::Connected);
        Establish::Connected(stream.listen_key)
    }

    /// Refresh the session now and then on every interval tick, until a
    /// refresh fails or the stream is closed.
    async fn keep_alive(&mut self, listen_key: &str) -> KeepAlive {
        let cancel = self.shared.cancel.clone();
        let mut interval = tokio::time::interval(self.config.refresh_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut confirmed = false;

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return KeepAlive::Cancelled,
                _ = interval.tick() => {}
            }

            tracing::info!(listen_key = %listen_key, "Keeping user data stream alive");

            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => return KeepAlive::Cancelled,
                result = self.session.keep_data_stream(listen_key) => result,
            };

            match result {
                Ok(()) => {
                    if !confirmed {
                        confirmed = true;
                        self.backoff.reset();
                    }
                }
                Err(e) => {
                    tracing::error!(
                        listen_key = %listen_key,
                        error = %e,
                        "User data stream session refresh failed"
                    );
                    return KeepAlive::Failed;
                }
            }
        }
    }

    async fn wait_before_reconnect(&mut self) -> bool {
        let Some(delay) = self.backoff.next_delay() else {
            tracing::error!(
                attempts = self.backoff.attempt_count(),
                "Giving up on user data stream"
            );
            return false;
        };

        self.shared.set_state(UserStreamState::ReconnectWait);
        tracing::info!(delay_ms = delay.as_millis(), "Attempting user data stream reconnect");

        tokio::select! {
            biased;
            () = self.shared.cancel.cancelled() => false,
            () = tokio::time::sleep(delay) => true,
        }
    }
}

impl fmt::Debug for UserStreamManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserStreamManager")
            .field("config", &self.config)
            .field("correlation_id", &self.shared.correlation_id)
            .field("state", &self.shared.state())
            .finish_non_exhaustive()
    }
}
