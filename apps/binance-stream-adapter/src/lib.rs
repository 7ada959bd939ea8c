#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Binance Stream Adapter - Market Data and User Data Feeds
//!
//! Subscribes to Binance WebSocket feeds, converts each compact wire
//! message into a normalized event and hands it to a callback. The
//! authenticated user data stream is kept alive across session refreshes
//! and reconnects.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Event types and pure conversions
//!   - `events`: Normalized events delivered to callbacks
//!   - `wire`: Raw wire messages with short keys
//!   - `transform`: Wire message → event conversions
//!   - `codec`: Frame text → event decoding
//!   - `subscription`: Symbols, feed kinds and stream addresses
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: Connection primitive and session HTTP contracts
//!   - `services`: Multiplexer, user stream lifecycle, feed facade
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `websocket`: `tokio-tungstenite` connection primitive
//!   - `binance`: `reqwest` session client
//!   - `config`: Environment-driven settings
//!   - `telemetry`: Tracing subscriber setup
//!   - `mock`: In-memory ports for tests
//!
//! # Data Flow
//!
//! ```text
//! <base>/bnbbtc@trade ──┐
//! <base>/ethbtc@trade ──┼──► JsonCodec ──► TradeEvent ──► callback
//! <base>/ltcbtc@trade ──┘
//!
//! POST userDataStream ──► <base>/<listenKey> ──► UserEvent ──► callback
//!        ▲                        │
//!        └── PUT every 30 min ────┘ (rebuilt on failure)
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Event types and conversions with no I/O.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::events::{
    AccountEvent, AssetBalance, CandleEvent, DepthEvent, ExecutionReportEvent, PartialDepthEvent,
    PriceLevel, TickerEvent, TradeEvent, UserEvent,
};
pub use domain::subscription::{
    DEFAULT_BASE_URL, PartialDepthRequest, PartialDepthRequests, StreamKind, SymbolList,
};

// Ports
pub use application::ports::{
    CloseEvent, CloseOptions, ConnectionHandlers, DataStream, SessionError, SessionPort,
    StreamConnection, StreamConnector,
};

// Services
pub use application::services::{
    BinanceStreams, FeedError, SubscriptionHandle, UserStreamConfig, UserStreamHandle,
    UserStreamState,
};

// Adapters
pub use infrastructure::binance::BinanceSessionClient;
pub use infrastructure::config::{AdapterConfig, ConfigError, Credentials, WebSocketSettings};
pub use infrastructure::websocket::{ConnectionError, TungsteniteConnector};

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, init as init_telemetry};
