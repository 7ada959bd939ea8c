//! Domain Layer - Feed requests, wire shapes and normalized events.
//!
//! Pure types and conversions with no I/O. Everything that touches a
//! socket or the REST API lives in the infrastructure layer.

/// Frame decoding into normalized events.
pub mod codec;

/// Normalized events handed to subscriber callbacks.
pub mod events;

/// Subscription requests and the connection address scheme.
pub mod subscription;

/// Wire-to-event field transforms.
pub mod transform;

/// Raw exchange payload shapes.
pub mod wire;
