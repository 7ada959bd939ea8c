//! WebSocket Connection Primitive
//!
//! `tokio-tungstenite` implementation of [`StreamConnector`]. Each opened
//! connection is owned by one background task that reads frames, answers
//! pings, runs the heartbeat and, unless closed with `keep_closed`,
//! reconnects after the socket drops.
//!
//! Dropping every [`Arc`] to a connection closes it for good.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{Sink, SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tracing::Instrument;

use super::heartbeat::{Heartbeat, HeartbeatAction, HeartbeatConfig};
use crate::application::ports::{
    CloseEvent, CloseOptions, ConnectionHandlers, NORMAL_CLOSURE, StreamConnection,
    StreamConnector,
};
use crate::application::services::reconnect::{ReconnectConfig, ReconnectError, ReconnectPolicy};
use crate::infrastructure::config::WebSocketSettings;

/// Close code reported when the socket drops without a close frame.
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// How long a handshake may still run after close was requested mid-connect.
const HANDSHAKE_GRACE: Duration = Duration::from_secs(5);

// =============================================================================
// Error Type
// =============================================================================

/// Reasons a live connection ends without being asked to.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// Transport or protocol failure.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Peer stayed silent past the heartbeat timeout.
    #[error("heartbeat timeout after {0:?}")]
    HeartbeatTimeout(Duration),

    /// Peer closed the stream.
    #[error("stream ended with code {code}: {reason}")]
    StreamEnded {
        /// Close code sent by the peer, or 1006 if none.
        code: u16,
        /// Close reason sent by the peer.
        reason: String,
    },
}

impl ConnectionError {
    /// Close notification for this error.
    #[must_use]
    pub fn close_event(&self) -> CloseEvent {
        match self {
            Self::StreamEnded { code, reason } => CloseEvent::new(*code, reason.clone()),
            other => CloseEvent::new(ABNORMAL_CLOSURE, other.to_string()),
        }
    }

    const fn is_failure(&self) -> bool {
        !matches!(self, Self::StreamEnded { .. })
    }
}

// =============================================================================
// Connector
// =============================================================================

/// Opens `tokio-tungstenite` connections.
///
/// Must be used from within a tokio runtime.
#[derive(Debug, Clone)]
pub struct TungsteniteConnector {
    reconnect_on_drop: bool,
    reconnect: ReconnectConfig,
    heartbeat: HeartbeatConfig,
}

impl Default for TungsteniteConnector {
    fn default() -> Self {
        Self::from_settings(&WebSocketSettings::default())
    }
}

impl TungsteniteConnector {
    /// Create a connector.
    #[must_use]
    pub const fn new(
        reconnect_on_drop: bool,
        reconnect: ReconnectConfig,
        heartbeat: HeartbeatConfig,
    ) -> Self {
        Self {
            reconnect_on_drop,
            reconnect,
            heartbeat,
        }
    }

    /// Create a connector from WebSocket settings.
    #[must_use]
    pub const fn from_settings(settings: &WebSocketSettings) -> Self {
        Self::new(
            settings.reconnect_on_drop,
            settings.reconnect_config(),
            settings.heartbeat_config(),
        )
    }
}

impl StreamConnector for TungsteniteConnector {
    fn open(&self, address: &str, handlers: ConnectionHandlers) -> Arc<dyn StreamConnection> {
        let (close_tx, close_rx) = mpsc::unbounded_channel();
        let connection = Arc::new(WsConnection {
            address: address.to_string(),
            close_tx,
        });

        let worker = ConnectionWorker {
            address: address.to_string(),
            handlers,
            close_rx,
            reconnect_on_drop: self.reconnect_on_drop,
            policy: ReconnectPolicy::new(self.reconnect.clone()),
            heartbeat: self.heartbeat,
        };

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let span = tracing::debug_span!("ws_connection", address = %address);
                runtime.spawn(worker.run().instrument(span));
            }
            Err(e) => {
                tracing::error!(address = %address, error = %e, "No runtime to drive connection");
                worker.handlers.error(&e.to_string());
                worker
                    .handlers
                    .close(&CloseEvent::new(ABNORMAL_CLOSURE, e.to_string()));
            }
        }

        connection
    }
}

// =============================================================================
// Connection Handle
// =============================================================================

#[derive(Debug, Clone)]
struct CloseRequest {
    code: u16,
    reason: String,
    keep_closed: bool,
}

/// Handle to a connection driven by a background task.
#[derive(Debug)]
pub struct WsConnection {
    address: String,
    close_tx: mpsc::UnboundedSender<CloseRequest>,
}

impl StreamConnection for WsConnection {
    fn address(&self) -> &str {
        &self.address
    }

    fn close(&self, code: u16, reason: &str, options: &CloseOptions) {
        let request = CloseRequest {
            code,
            reason: reason.to_string(),
            keep_closed: options.keep_closed,
        };
        if self.close_tx.send(request).is_err() {
            tracing::debug!(address = %self.address, "Connection already stopped");
        }
    }
}

// =============================================================================
// Worker
// =============================================================================

struct ConnectionWorker {
    address: String,
    handlers: ConnectionHandlers,
    close_rx: mpsc::UnboundedReceiver<CloseRequest>,
    reconnect_on_drop: bool,
    policy: ReconnectPolicy,
    heartbeat: HeartbeatConfig,
}

impl ConnectionWorker {
    async fn run(mut self) {
        loop {
            match self.connect_and_run().await {
                Ok(request) => {
                    tracing::debug!(
                        code = request.code,
                        reason = %request.reason,
                        keep_closed = request.keep_closed,
                        "Connection closed on request"
                    );
                    self.handlers
                        .close(&CloseEvent::new(request.code, request.reason.clone()));
                    if request.keep_closed {
                        return;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Connection dropped");
                    if e.is_failure() {
                        self.handlers.error(&e.to_string());
                    }
                    self.handlers.close(&e.close_event());
                    if !self.reconnect_on_drop {
                        return;
                    }
                }
            }

            let Some(delay) = self.policy.next_delay() else {
                let error = ReconnectError::MaxAttemptsExceeded(self.policy.attempt_count());
                tracing::error!(error = %error, "Giving up on connection");
                self.handlers.error(&error.to_string());
                return;
            };
            tracing::info!(
                attempt = self.policy.attempt_count(),
                delay_ms = delay.as_millis(),
                "Reconnecting"
            );
            if !self.wait(delay).await {
                return;
            }
        }
    }

    /// Sleep before reconnecting. Returns `false` if closed for good meanwhile.
    async fn wait(&mut self, delay: Duration) -> bool {
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                biased;
                request = self.close_rx.recv() => match request {
                    Some(request) if !request.keep_closed => {}
                    _ => {
                        tracing::debug!("Closed while waiting to reconnect");
                        return false;
                    }
                },
                () = &mut sleep => return true,
            }
        }
    }

    /// Run one connection until a close request (returned) or a drop.
    async fn connect_and_run(&mut self) -> Result<CloseRequest, ConnectionError> {
        tracing::info!(address = %self.address, "Connecting");

        let connect = tokio_tungstenite::connect_async(self.address.as_str());
        tokio::pin!(connect);
        let ws_stream = tokio::select! {
            biased;
            request = self.close_rx.recv() => {
                let request = request.unwrap_or_else(dropped_request);
                // Finish an in-flight handshake so the peer still gets a close frame.
                if let Ok(Ok((mut ws_stream, _))) =
                    tokio::time::timeout(HANDSHAKE_GRACE, &mut connect).await
                {
                    send_close(&mut ws_stream, &request).await;
                }
                return Ok(request);
            }
            result = &mut connect => result?.0,
        };

        tracing::info!(address = %self.address, "Connected");
        self.policy.reset();

        let (mut write, mut read) = ws_stream.split();
        let mut heartbeat = Heartbeat::new(self.heartbeat);
        let mut ticks = heartbeat.interval();

        loop {
            tokio::select! {
                biased;
                request = self.close_rx.recv() => {
                    let request = request.unwrap_or_else(dropped_request);
                    send_close(&mut write, &request).await;
                    return Ok(request);
                }
                _ = ticks.tick() => match heartbeat.on_tick() {
                    HeartbeatAction::Ping => write.send(Message::Ping(Vec::new().into())).await?,
                    HeartbeatAction::Expired(silence) => {
                        return Err(ConnectionError::HeartbeatTimeout(silence));
                    }
                },
                msg = read.next() => {
                    heartbeat.record_activity();
                    match msg {
                        Some(Ok(Message::Text(text))) => self.handlers.message(text.as_str()),
                        Some(Ok(Message::Binary(data))) => match std::str::from_utf8(&data) {
                            Ok(text) => self.handlers.message(text),
                            Err(_) => {
                                tracing::warn!(len = data.len(), "Dropping non-UTF8 binary frame");
                            }
                        },
                        Some(Ok(Message::Ping(data))) => write.send(Message::Pong(data)).await?,
                        Some(Ok(Message::Close(frame))) => {
                            let (code, reason) = frame.map_or_else(
                                || (ABNORMAL_CLOSURE, String::new()),
                                |f| (u16::from(f.code), f.reason.as_str().to_string()),
                            );
                            return Err(ConnectionError::StreamEnded { code, reason });
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => return Err(e.into()),
                        None => {
                            return Err(ConnectionError::StreamEnded {
                                code: ABNORMAL_CLOSURE,
                                reason: "stream ended".to_string(),
                            });
                        }
                    }
                }
            }
        }
    }
}

async fn send_close<S>(sink: &mut S, request: &CloseRequest)
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    let frame = CloseFrame {
        code: CloseCode::from(request.code),
        reason: request.reason.clone().into(),
    };
    if let Err(e) = sink.send(Message::Close(Some(frame))).await {
        tracing::debug!(error = %e, "Failed to send close frame");
    }
}

/// Every handle was dropped; close for good.
fn dropped_request() -> CloseRequest {
    CloseRequest {
        code: NORMAL_CLOSURE,
        reason: "Connection handle dropped".to_string(),
        keep_closed: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use tokio::net::TcpListener;

    fn recording_handlers() -> (ConnectionHandlers, Arc<Mutex<Vec<CloseEvent>>>) {
        let closes = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&closes);
        let handlers = ConnectionHandlers::new(|_| {}).on_close(move |event| {
            sink.lock().push(event.clone());
        });
        (handlers, closes)
    }

    fn connector(reconnect_on_drop: bool) -> TungsteniteConnector {
        TungsteniteConnector::new(
            reconnect_on_drop,
            ReconnectConfig::new(
                Duration::from_millis(10),
                Duration::from_millis(50),
                2.0,
                0.0,
                0,
            ),
            HeartbeatConfig::default(),
        )
    }

    #[test]
    fn stream_ended_keeps_peer_code() {
        let err = ConnectionError::StreamEnded {
            code: 1001,
            reason: "going away".to_string(),
        };
        assert_eq!(err.close_event(), CloseEvent::new(1001, "going away"));
        assert!(!err.is_failure());
    }

    #[test]
    fn heartbeat_timeout_is_abnormal() {
        let err = ConnectionError::HeartbeatTimeout(Duration::from_secs(90));
        assert_eq!(err.close_event().code, ABNORMAL_CLOSURE);
        assert!(err.is_failure());
    }

    #[test]
    fn default_connector_reconnects_on_drop() {
        let connector = TungsteniteConnector::default();
        assert!(connector.reconnect_on_drop);
        assert_eq!(connector.heartbeat, HeartbeatConfig::default());
    }

    #[test]
    fn open_without_runtime_reports_failure() {
        let (handlers, closes) = recording_handlers();
        let connection = connector(true).open("ws://127.0.0.1:9/ws/x", handlers);

        assert_eq!(connection.address(), "ws://127.0.0.1:9/ws/x");
        let closes = closes.lock();
        assert_eq!(closes.len(), 1);
        assert_eq!(closes[0].code, ABNORMAL_CLOSURE);
    }

    #[tokio::test]
    async fn close_with_keep_closed_stops_reconnecting() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = format!("ws://{}/ws/btcusdt@trade", listener.local_addr().unwrap());
        let (handlers, closes) = recording_handlers();

        let connection = connector(true).open(&address, handlers);
        let (stream, _) = listener.accept().await.unwrap();
        let mut server = tokio_tungstenite::accept_async(stream).await.unwrap();

        connection.close(
            NORMAL_CLOSURE,
            "Close handle was called",
            &CloseOptions::new().with_keep_closed(),
        );

        let frame = loop {
            match server.next().await {
                Some(Ok(Message::Close(frame))) => break frame,
                Some(Ok(_)) => {}
                other => panic!("expected close frame, got {other:?}"),
            }
        };
        let frame = frame.unwrap();
        assert_eq!(u16::from(frame.code), NORMAL_CLOSURE);
        assert_eq!(frame.reason.as_str(), "Close handle was called");

        let reconnect =
            tokio::time::timeout(Duration::from_millis(200), listener.accept()).await;
        assert!(reconnect.is_err(), "should not reconnect");
        assert_eq!(closes.lock()[0].code, NORMAL_CLOSURE);
    }

    #[tokio::test]
    async fn close_after_first_frame_sends_close_frame() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = format!("ws://{}/ws/btcusdt@trade", listener.local_addr().unwrap());
        let (delivered_tx, delivered_rx) = tokio::sync::oneshot::channel();
        let delivered_tx = Mutex::new(Some(delivered_tx));
        let handlers = ConnectionHandlers::new(move |_| {
            if let Some(tx) = delivered_tx.lock().take() {
                let _ = tx.send(());
            }
        });

        let connection = connector(true).open(&address, handlers);
        let (stream, _) = listener.accept().await.unwrap();
        let mut server = tokio_tungstenite::accept_async(stream).await.unwrap();
        server.send(Message::Text("{}".into())).await.unwrap();
        delivered_rx.await.unwrap();

        connection.close(NORMAL_CLOSURE, "bye", &CloseOptions::new().with_keep_closed());

        match server.next().await {
            Some(Ok(Message::Close(Some(frame)))) => {
                assert_eq!(u16::from(frame.code), NORMAL_CLOSURE);
                assert_eq!(frame.reason.as_str(), "bye");
            }
            other => panic!("expected close frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn dropping_last_reference_closes_for_good() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = format!("ws://{}/ws/btcusdt@ticker", listener.local_addr().unwrap());
        let (handlers, closes) = recording_handlers();

        let connection = connector(true).open(&address, handlers);
        let (stream, _) = listener.accept().await.unwrap();
        let mut server = tokio_tungstenite::accept_async(stream).await.unwrap();
        drop(connection);

        match server.next().await {
            Some(Ok(Message::Close(Some(frame)))) => {
                assert_eq!(u16::from(frame.code), NORMAL_CLOSURE);
                assert_eq!(frame.reason.as_str(), "Connection handle dropped");
            }
            other => panic!("expected close frame, got {other:?}"),
        }

        let reconnect =
            tokio::time::timeout(Duration::from_millis(200), listener.accept()).await;
        assert!(reconnect.is_err(), "should not reconnect");
        assert_eq!(closes.lock()[0].code, NORMAL_CLOSURE);
    }

    #[tokio::test]
    async fn reports_exhausted_attempts() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = format!("ws://{}/ws/btcusdt@trade", listener.local_addr().unwrap());
        drop(listener);

        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&errors);
        let handlers =
            ConnectionHandlers::new(|_| {}).on_error(move |e| sink.lock().push(e.to_string()));
        let connector = TungsteniteConnector::new(
            true,
            ReconnectConfig::new(Duration::from_millis(5), Duration::from_millis(5), 1.0, 0.0, 2),
            HeartbeatConfig::default(),
        );

        let _connection = connector.open(&address, handlers);
        tokio::time::sleep(Duration::from_millis(500)).await;

        let errors = errors.lock();
        assert_eq!(errors.len(), 4);
        assert!(errors[3].contains("maximum reconnection attempts (2)"));
    }

    #[tokio::test]
    async fn delivers_text_and_reconnects_after_drop() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = format!("ws://{}/ws/btcusdt@trade", listener.local_addr().unwrap());
        let messages = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&messages);
        let handlers = ConnectionHandlers::new(move |text| sink.lock().push(text.to_string()));

        let connection = connector(true).open(&address, handlers);

        let (stream, _) = listener.accept().await.unwrap();
        let mut server = tokio_tungstenite::accept_async(stream).await.unwrap();
        server
            .send(Message::Text(r#"{"e":"trade"}"#.into()))
            .await
            .unwrap();
        drop(server);

        let reconnect = tokio::time::timeout(Duration::from_secs(2), listener.accept()).await;
        assert!(reconnect.is_ok(), "should reconnect after drop");
        assert_eq!(messages.lock().as_slice(), [r#"{"e":"trade"}"#.to_string()]);

        connection.close(NORMAL_CLOSURE, "done", &CloseOptions::new().with_keep_closed());
    }
}
