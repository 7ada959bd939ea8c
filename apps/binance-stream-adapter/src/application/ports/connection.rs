//! Connection Port (Driven Port)
//!
//! Contract for the persistent streaming connection primitive: open an
//! address with a set of handlers, receive text frames through them, and
//! close with a code, a reason and options.
//!
//! Handlers are registered up front when the connection is opened rather
//! than assigned afterwards, so a message can never arrive before its
//! handler exists.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

/// WebSocket "normal closure" status code.
pub const NORMAL_CLOSURE: u16 = 1000;

/// Reason sent when a caller closes a subscription or user stream handle.
pub const CLOSE_HANDLE_REASON: &str = "Close handle was called";

// =============================================================================
// Handlers
// =============================================================================

/// Callback receiving each text payload.
pub type MessageHandler = Arc<dyn Fn(&str) + Send + Sync>;

/// Callback receiving close notifications.
pub type CloseHandler = Arc<dyn Fn(&CloseEvent) + Send + Sync>;

/// Callback receiving transport errors, already rendered as text.
pub type ErrorHandler = Arc<dyn Fn(&str) + Send + Sync>;

/// A connection close notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseEvent {
    /// Close status code (1006 when the transport dropped without a frame).
    pub code: u16,
    /// Close reason, possibly empty.
    pub reason: String,
}

impl CloseEvent {
    /// Create a close event.
    #[must_use]
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }
}

/// Handlers attached to one connection.
#[derive(Clone)]
pub struct ConnectionHandlers {
    on_message: MessageHandler,
    on_close: Option<CloseHandler>,
    on_error: Option<ErrorHandler>,
}

impl ConnectionHandlers {
    /// Handlers with only a message callback.
    pub fn new<F>(on_message: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        Self {
            on_message: Arc::new(on_message),
            on_close: None,
            on_error: None,
        }
    }

    /// Attach a close callback.
    #[must_use]
    pub fn on_close<F>(mut self, handler: F) -> Self
    where
        F: Fn(&CloseEvent) + Send + Sync + 'static,
    {
        self.on_close = Some(Arc::new(handler));
        self
    }

    /// Attach an error callback.
    #[must_use]
    pub fn on_error<F>(mut self, handler: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(handler));
        self
    }

    /// Deliver a text payload.
    pub fn message(&self, text: &str) {
        (self.on_message)(text);
    }

    /// Deliver a close notification, if a close callback is attached.
    pub fn close(&self, event: &CloseEvent) {
        if let Some(handler) = &self.on_close {
            handler(event);
        }
    }

    /// Deliver an error, if an error callback is attached.
    pub fn error(&self, error: &str) {
        if let Some(handler) = &self.on_error {
            handler(error);
        }
    }
}

impl fmt::Debug for ConnectionHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandlers")
            .field("on_close", &self.on_close.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Close Options
// =============================================================================

/// Options passed to [`StreamConnection::close`].
///
/// `keep_closed` suppresses the primitive's own reconnect-on-drop. Any other
/// option is carried untouched in `extra` for the primitive to interpret.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CloseOptions {
    /// Stay closed instead of reconnecting.
    pub keep_closed: bool,
    /// Implementation-defined pass-through options.
    pub extra: Map<String, Value>,
}

impl CloseOptions {
    /// Empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pass-through option.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// The same options with `keep_closed` forced on.
    #[must_use]
    pub fn with_keep_closed(mut self) -> Self {
        self.keep_closed = true;
        self
    }
}

// =============================================================================
// Ports
// =============================================================================

/// One open streaming connection.
///
/// `close` must be safe to call any number of times and from any state.
pub trait StreamConnection: Send + Sync {
    /// Address this connection was opened with.
    fn address(&self) -> &str;

    /// Close the connection.
    fn close(&self, code: u16, reason: &str, options: &CloseOptions);
}

/// Opens streaming connections.
pub trait StreamConnector: Send + Sync {
    /// Open a connection to `address`, delivering frames to `handlers`.
    ///
    /// Returns immediately; the connection is established in the background
    /// and failures are reported through the error and close handlers.
    fn open(&self, address: &str, handlers: ConnectionHandlers) -> Arc<dyn StreamConnection>;
}
