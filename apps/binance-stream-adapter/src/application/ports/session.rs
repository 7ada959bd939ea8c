//! Session Port (Driven Port)
//!
//! Interface to the authenticated HTTP endpoints that issue and refresh
//! user data stream session tokens (listen keys).

use async_trait::async_trait;
use serde::Deserialize;

/// A user data stream session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DataStream {
    /// Session token appended to the stream address.
    #[serde(rename = "listenKey")]
    pub listen_key: String,
}

impl DataStream {
    /// Wrap a listen key.
    #[must_use]
    pub fn new(listen_key: impl Into<String>) -> Self {
        Self {
            listen_key: listen_key.into(),
        }
    }
}

/// Session request errors.
///
/// The user stream manager treats every variant the same way: the session
/// is considered dead and the stream is rebuilt.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    /// Request could not be sent or no response arrived.
    #[error("session request failed: {message}")]
    Transport {
        /// Error details.
        message: String,
    },

    /// The exchange answered with an error status.
    #[error("session request rejected with status {status}: {body}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// Response body could not be decoded.
    #[error("invalid session response: {message}")]
    InvalidResponse {
        /// Error details.
        message: String,
    },

    /// No API key is configured.
    #[error("API key not configured")]
    MissingApiKey,
}

/// Port for user data stream session management.
#[async_trait]
pub trait SessionPort: Send + Sync {
    /// Start a new user data stream session.
    async fn get_data_stream(&self) -> Result<DataStream, SessionError>;

    /// Extend the validity of an existing session.
    async fn keep_data_stream(&self, listen_key: &str) -> Result<(), SessionError>;
}
