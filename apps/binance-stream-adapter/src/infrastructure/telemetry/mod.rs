//! Tracing Subscriber Setup
//!
//! Installs a `tracing-subscriber` fmt layer filtered by `RUST_LOG`, with a
//! crate-level default when `RUST_LOG` is unset or invalid.
//!
//! # Usage
//!
//! ```ignore
//! use binance_stream_adapter::infrastructure::telemetry;
//!
//! telemetry::init();
//!
//! let span = tracing::info_span!("user_stream", correlation_id = "abc");
//! let _entered = span.enter();
//! tracing::info!("Acquiring user data stream session");
//! ```

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_DIRECTIVE: &str = "binance_stream_adapter=info";

/// Noisy dependencies capped regardless of the default.
const QUIET_DIRECTIVES: &[&str] = &[
    "tungstenite=warn",
    "tokio_tungstenite=warn",
    "hyper=warn",
    "reqwest=warn",
];

/// Telemetry configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Filter used when `RUST_LOG` is not set.
    pub default_directive: String,
    /// Include the event target in each line.
    pub with_target: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            default_directive: DEFAULT_DIRECTIVE.to_string(),
            with_target: true,
        }
    }
}

/// Telemetry initialization error.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// A global subscriber was already installed.
    #[error("failed to install tracing subscriber: {0}")]
    Install(String),
}

/// Initialize telemetry with the default configuration.
///
/// Does nothing if a subscriber is already installed.
pub fn init() {
    if let Err(e) = init_with_config(&TelemetryConfig::default()) {
        eprintln!("{e}");
    }
}

/// Initialize telemetry with a custom configuration.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_with_config(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(config.with_target)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(env_filter(config))
        .with(fmt_layer)
        .try_init()
        .map_err(|e| TelemetryError::Install(e.to_string()))
}

fn env_filter(config: &TelemetryConfig) -> EnvFilter {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_directive));

    QUIET_DIRECTIVES
        .iter()
        .filter_map(|directive| directive.parse().ok())
        .fold(filter, EnvFilter::add_directive)
}
