//! Binance REST Adapters
//!
//! HTTP clients for the Binance REST API used alongside the WebSocket feeds.

/// User data stream session client.
pub mod session;

pub use session::{API_KEY_HEADER, BinanceSessionClient, USER_DATA_STREAM_PATH};
