//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port interfaces
//! defined in the application layer.

/// Binance REST clients (user data stream sessions).
pub mod binance;

/// Environment-driven configuration.
pub mod config;

/// In-memory connector and session for tests.
pub mod mock;

/// Tracing subscriber setup.
pub mod telemetry;

/// `tokio-tungstenite` connection primitive.
pub mod websocket;
