//! WebSocket Adapter
//!
//! Concrete connection primitive built on `tokio-tungstenite`.

/// Connector, connection handle and worker task.
pub mod connection;

/// Ping/pong liveness tracking.
pub mod heartbeat;

pub use connection::{ABNORMAL_CLOSURE, ConnectionError, TungsteniteConnector, WsConnection};
pub use heartbeat::{Heartbeat, HeartbeatAction, HeartbeatConfig};
