//! Configuration Module
//!
//! Environment-driven configuration for the adapter and its binary.

mod settings;

pub use settings::{
    AdapterConfig, ConfigError, Credentials, DEFAULT_REST_BASE_URL, EndpointSettings,
    UserStreamSettings, WebSocketSettings,
};
