//! Application Layer - Feed services and port definitions.
//!
//! The services open connections and drive the user stream lifecycle
//! through the ports; adapters for the ports live in the infrastructure
//! layer.

/// Port interfaces for the connection primitive and session client.
pub mod ports;

/// Application services for subscriptions and the user stream.
pub mod services;
