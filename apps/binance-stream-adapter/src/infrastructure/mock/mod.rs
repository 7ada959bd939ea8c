//! In-Memory Port Implementations
//!
//! `MockConnector` and `MockSession` stand in for the WebSocket and HTTP
//! adapters. Connections never touch the network: tests push frames with
//! [`MockConnection::emit`] and inspect what was closed. Sessions replay
//! queued results and record every call.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::application::ports::{
    CloseEvent, CloseOptions, ConnectionHandlers, DataStream, SessionError, SessionPort,
    StreamConnection, StreamConnector,
};

// =============================================================================
// Connections
// =============================================================================

/// One `close` call on a [`MockConnection`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedClose {
    /// Close code.
    pub code: u16,
    /// Close reason.
    pub reason: String,
    /// Options passed through.
    pub options: CloseOptions,
}

/// Connection that records closes and replays frames on demand.
#[derive(Debug)]
pub struct MockConnection {
    address: String,
    handlers: ConnectionHandlers,
    closes: Mutex<Vec<RecordedClose>>,
}

impl MockConnection {
    /// Deliver a text frame to the message handler.
    pub fn emit(&self, text: &str) {
        self.handlers.message(text);
    }

    /// Deliver a close notification.
    pub fn emit_close(&self, code: u16, reason: &str) {
        self.handlers.close(&CloseEvent::new(code, reason));
    }

    /// Deliver an error notification.
    pub fn emit_error(&self, error: &str) {
        self.handlers.error(error);
    }

    /// Every `close` call so far.
    #[must_use]
    pub fn closes(&self) -> Vec<RecordedClose> {
        self.closes.lock().clone()
    }

    /// Whether `close` was called with `keep_closed`.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closes.lock().iter().any(|c| c.options.keep_closed)
    }
}

impl StreamConnection for MockConnection {
    fn address(&self) -> &str {
        &self.address
    }

    fn close(&self, code: u16, reason: &str, options: &CloseOptions) {
        self.closes.lock().push(RecordedClose {
            code,
            reason: reason.to_string(),
            options: options.clone(),
        });
    }
}

/// Connector that hands out [`MockConnection`]s.
#[derive(Debug, Default)]
pub struct MockConnector {
    connections: Mutex<Vec<Arc<MockConnection>>>,
}

impl MockConnector {
    /// Create a connector with no connections.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Addresses opened so far, in order.
    #[must_use]
    pub fn opened_addresses(&self) -> Vec<String> {
        self.connections
            .lock()
            .iter()
            .map(|c| c.address.clone())
            .collect()
    }

    /// The `index`-th opened connection.
    #[must_use]
    pub fn connection(&self, index: usize) -> Option<Arc<MockConnection>> {
        self.connections.lock().get(index).cloned()
    }

    /// The most recently opened connection.
    #[must_use]
    pub fn last_connection(&self) -> Option<Arc<MockConnection>> {
        self.connections.lock().last().cloned()
    }
}

impl StreamConnector for MockConnector {
    fn open(&self, address: &str, handlers: ConnectionHandlers) -> Arc<dyn StreamConnection> {
        let connection = Arc::new(MockConnection {
            address: address.to_string(),
            handlers,
            closes: Mutex::new(Vec::new()),
        });
        self.connections.lock().push(Arc::clone(&connection));
        connection
    }
}

// =============================================================================
// Sessions
// =============================================================================

#[derive(Debug, Default)]
struct SessionLog {
    data_streams: VecDeque<Result<DataStream, SessionError>>,
    keep_alives: VecDeque<Result<(), SessionError>>,
    data_stream_calls: Vec<Instant>,
    keep_alive_calls: Vec<(Instant, String)>,
}

/// Session port replaying queued results.
///
/// With an empty queue, session requests succeed with `listen-key-<n>`
/// (counting from 1) and keep-alives succeed.
#[derive(Debug, Default)]
pub struct MockSession {
    log: Mutex<SessionLog>,
}

impl MockSession {
    /// Create a session that always succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the result of the next session request.
    pub fn push_data_stream(&self, result: Result<String, SessionError>) {
        self.log
            .lock()
            .data_streams
            .push_back(result.map(DataStream::new));
    }

    /// Queue the result of the next keep-alive.
    pub fn push_keep_alive(&self, result: Result<(), SessionError>) {
        self.log.lock().keep_alives.push_back(result);
    }

    /// Number of session requests made.
    #[must_use]
    pub fn data_stream_calls(&self) -> usize {
        self.log.lock().data_stream_calls.len()
    }

    /// When each session request was made.
    #[must_use]
    pub fn data_stream_times(&self) -> Vec<Instant> {
        self.log.lock().data_stream_calls.clone()
    }

    /// When each keep-alive was made and for which key.
    #[must_use]
    pub fn keep_alive_calls(&self) -> Vec<(Instant, String)> {
        self.log.lock().keep_alive_calls.clone()
    }
}

#[async_trait]
impl SessionPort for MockSession {
    async fn get_data_stream(&self) -> Result<DataStream, SessionError> {
        let mut log = self.log.lock();
        log.data_stream_calls.push(Instant::now());
        let n = log.data_stream_calls.len();
        log.data_streams
            .pop_front()
            .unwrap_or_else(|| Ok(DataStream::new(format!("listen-key-{n}"))))
    }

    async fn keep_data_stream(&self, listen_key: &str) -> Result<(), SessionError> {
        let mut log = self.log.lock();
        log.keep_alive_calls
            .push((Instant::now(), listen_key.to_string()));
        log.keep_alives.pop_front().unwrap_or(Ok(()))
    }
}
