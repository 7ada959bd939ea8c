//! Port Interfaces
//!
//! Contracts between the feed services and the outside world, following
//! the Hexagonal Architecture pattern. Infrastructure adapters implement
//! them; the mocks in `infrastructure::mock` implement them for tests.
//!
//! ## Driven Ports (Outbound)
//!
//! - `StreamConnector` / `StreamConnection`: the persistent streaming
//!   connection primitive
//! - `SessionPort`: user data stream session token issue and refresh

mod connection;
mod session;

pub use connection::{
    CLOSE_HANDLE_REASON, CloseEvent, CloseHandler, CloseOptions, ConnectionHandlers, ErrorHandler,
    MessageHandler, NORMAL_CLOSURE, StreamConnection, StreamConnector,
};
pub use session::{DataStream, SessionError, SessionPort};
