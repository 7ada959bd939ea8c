//! Application Services
//!
//! Services that orchestrate domain logic and coordinate between ports.
//!
//! - `Multiplexer`: one connection per symbol, frames decoded into events
//! - `UserStreamManager`: user data stream session and connection lifecycle
//! - `BinanceStreams`: the named feed operations built on both

/// Feed facade.
pub mod feeds;

/// Exponential reconnect backoff.
pub mod reconnect;

/// Multi-symbol subscriptions.
pub mod subscription;

/// User data stream lifecycle.
pub mod user_stream;

pub use feeds::{BinanceStreams, FeedError};
pub use subscription::{Multiplexer, SubscriptionHandle};
pub use user_stream::{UserStreamConfig, UserStreamHandle, UserStreamManager, UserStreamState};
