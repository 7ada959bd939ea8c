//! Adapter Configuration Settings
//!
//! Configuration types for the stream adapter, loaded from environment
//! variables. Unparseable numeric values fall back to their defaults;
//! malformed addresses and empty required lists are errors.

use std::time::Duration;

use crate::application::services::reconnect::ReconnectConfig;
use crate::application::services::user_stream::{
    DEFAULT_RECONNECT_BASE, DEFAULT_REFRESH_INTERVAL, UserStreamConfig,
};
use crate::domain::subscription::DEFAULT_BASE_URL;
use crate::infrastructure::websocket::HeartbeatConfig;

/// Default REST endpoint for session requests.
pub const DEFAULT_REST_BASE_URL: &str = "https://api.binance.com";

/// Binance API credentials.
#[derive(Clone)]
pub struct Credentials {
    api_key: String,
}

impl Credentials {
    /// Create new credentials.
    #[must_use]
    pub const fn new(api_key: String) -> Self {
        Self { api_key }
    }

    /// Get the API key.
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// Endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointSettings {
    /// Streaming base address.
    pub ws_base_url: String,
    /// REST base address for session requests.
    pub rest_base_url: String,
    /// Timeout of each session request.
    pub http_timeout: Duration,
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self {
            ws_base_url: DEFAULT_BASE_URL.to_string(),
            rest_base_url: DEFAULT_REST_BASE_URL.to_string(),
            http_timeout: Duration::from_secs(10),
        }
    }
}

/// User data stream timing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserStreamSettings {
    /// Interval between session refreshes.
    pub refresh_interval: Duration,
    /// First reconnect delay.
    pub reconnect_base: Duration,
}

impl Default for UserStreamSettings {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            reconnect_base: DEFAULT_RECONNECT_BASE,
        }
    }
}

/// WebSocket connection settings.
#[derive(Debug, Clone, PartialEq)]
pub struct WebSocketSettings {
    /// Reconnect automatically when a connection drops without `keep_closed`.
    pub reconnect_on_drop: bool,
    /// Heartbeat ping interval.
    pub heartbeat_interval: Duration,
    /// Heartbeat timeout before considering connection dead.
    pub heartbeat_timeout: Duration,
    /// Initial reconnection delay.
    pub reconnect_delay_initial: Duration,
    /// Maximum reconnection delay.
    pub reconnect_delay_max: Duration,
    /// Reconnection delay multiplier for exponential backoff.
    pub reconnect_delay_multiplier: f64,
    /// Maximum reconnection attempts before giving up (0 = unlimited).
    pub max_reconnect_attempts: u32,
}

impl Default for WebSocketSettings {
    fn default() -> Self {
        Self {
            reconnect_on_drop: true,
            heartbeat_interval: Duration::from_secs(30),
            heartbeat_timeout: Duration::from_secs(60),
            reconnect_delay_initial: Duration::from_millis(500),
            reconnect_delay_max: Duration::from_secs(30),
            reconnect_delay_multiplier: 2.0,
            max_reconnect_attempts: 0,
        }
    }
}

impl WebSocketSettings {
    /// Reconnect policy for dropped connections.
    #[must_use]
    pub const fn reconnect_config(&self) -> ReconnectConfig {
        ReconnectConfig::new(
            self.reconnect_delay_initial,
            self.reconnect_delay_max,
            self.reconnect_delay_multiplier,
            0.1,
            self.max_reconnect_attempts,
        )
    }

    /// Heartbeat timing.
    #[must_use]
    pub const fn heartbeat_config(&self) -> HeartbeatConfig {
        HeartbeatConfig::new(self.heartbeat_interval, self.heartbeat_timeout)
    }
}

/// Complete adapter configuration.
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    /// Endpoints.
    pub endpoints: EndpointSettings,
    /// API credentials; only the user feed needs them.
    pub credentials: Option<Credentials>,
    /// User data stream timing.
    pub user_stream: UserStreamSettings,
    /// WebSocket connection settings.
    pub websocket: WebSocketSettings,
    /// Symbols the binary subscribes to.
    pub symbols: Vec<String>,
    /// Correlation id for the user stream, if fixed.
    pub correlation_id: Option<String>,
}

impl AdapterConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if an address is malformed or the symbol list is empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from any key lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if an address is malformed or the symbol list is empty.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvReader(lookup);
        let endpoint_defaults = EndpointSettings::default();
        let ws_defaults = WebSocketSettings::default();
        let user_defaults = UserStreamSettings::default();

        let ws_base_url = env.string("BINANCE_WS_BASE_URL", &endpoint_defaults.ws_base_url);
        validate_url("BINANCE_WS_BASE_URL", &ws_base_url, &["ws://", "wss://"])?;

        let rest_base_url = env.string("BINANCE_REST_BASE_URL", &endpoint_defaults.rest_base_url);
        validate_url("BINANCE_REST_BASE_URL", &rest_base_url, &["http://", "https://"])?;

        let endpoints = EndpointSettings {
            ws_base_url: ws_base_url.trim_end_matches('/').to_string(),
            rest_base_url: rest_base_url.trim_end_matches('/').to_string(),
            http_timeout: env.duration_secs(
                "BINANCE_HTTP_TIMEOUT_SECS",
                endpoint_defaults.http_timeout,
            ),
        };

        let credentials = env
            .get("BINANCE_API_KEY")
            .filter(|key| !key.is_empty())
            .map(Credentials::new);

        let user_stream = UserStreamSettings {
            refresh_interval: env.duration_secs(
                "BINANCE_USER_STREAM_REFRESH_SECS",
                user_defaults.refresh_interval,
            ),
            reconnect_base: env.duration_millis(
                "BINANCE_USER_STREAM_RECONNECT_BASE_MS",
                user_defaults.reconnect_base,
            ),
        };

        let websocket = WebSocketSettings {
            reconnect_on_drop: env.bool(
                "BINANCE_WS_RECONNECT_ON_DROP",
                ws_defaults.reconnect_on_drop,
            ),
            heartbeat_interval: env.duration_secs(
                "BINANCE_WS_HEARTBEAT_INTERVAL_SECS",
                ws_defaults.heartbeat_interval,
            ),
            heartbeat_timeout: env.duration_secs(
                "BINANCE_WS_HEARTBEAT_TIMEOUT_SECS",
                ws_defaults.heartbeat_timeout,
            ),
            reconnect_delay_initial: env.duration_millis(
                "BINANCE_WS_RECONNECT_DELAY_INITIAL_MS",
                ws_defaults.reconnect_delay_initial,
            ),
            reconnect_delay_max: env.duration_secs(
                "BINANCE_WS_RECONNECT_DELAY_MAX_SECS",
                ws_defaults.reconnect_delay_max,
            ),
            reconnect_delay_multiplier: env.parsed(
                "BINANCE_WS_RECONNECT_DELAY_MULTIPLIER",
                ws_defaults.reconnect_delay_multiplier,
            ),
            max_reconnect_attempts: env.parsed(
                "BINANCE_WS_MAX_RECONNECT_ATTEMPTS",
                ws_defaults.max_reconnect_attempts,
            ),
        };

        let symbols: Vec<String> = env
            .string("BINANCE_SYMBOLS", "BTCUSDT")
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_uppercase)
            .collect();
        if symbols.is_empty() {
            return Err(ConfigError::EmptyValue("BINANCE_SYMBOLS".to_string()));
        }

        let correlation_id = env.get("BINANCE_CORRELATION_ID").filter(|id| !id.is_empty());

        Ok(Self {
            endpoints,
            credentials,
            user_stream,
            websocket,
            symbols,
            correlation_id,
        })
    }

    /// User stream configuration for the feed facade.
    #[must_use]
    pub fn user_stream_config(&self) -> UserStreamConfig {
        UserStreamConfig {
            base_url: self.endpoints.ws_base_url.clone(),
            refresh_interval: self.user_stream.refresh_interval,
            reconnect_base: self.user_stream.reconnect_base,
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
    /// Address with an unexpected scheme.
    #[error("environment variable {key} has invalid URL {value:?}, expected one of {expected}")]
    InvalidUrl {
        /// Variable name.
        key: String,
        /// Offending value.
        value: String,
        /// Accepted schemes.
        expected: String,
    },
}

fn validate_url(key: &str, value: &str, schemes: &[&str]) -> Result<(), ConfigError> {
    if schemes.iter().any(|scheme| value.starts_with(scheme)) {
        Ok(())
    } else {
        Err(ConfigError::InvalidUrl {
            key: key.to_string(),
            value: value.to_string(),
            expected: schemes.join(", "),
        })
    }
}

struct EnvReader<F>(F);

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key)
    }

    fn string(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn parsed<T: std::str::FromStr>(&self, key: &str, default: T) -> T {
        self.get(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    fn bool(&self, key: &str, default: bool) -> bool {
        self.get(key)
            .map_or(default, |v| match v.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => default,
            })
    }

    fn duration_secs(&self, key: &str, default: Duration) -> Duration {
        self.get(key)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map_or(default, Duration::from_secs)
    }

    fn duration_millis(&self, key: &str, default: Duration) -> Duration {
        self.get(key)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map_or(default, Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<AdapterConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        AdapterConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let config = config(&[]).unwrap();
        assert_eq!(config.endpoints, EndpointSettings::default());
        assert_eq!(config.endpoints.ws_base_url, "wss://stream.binance.com:9443/ws");
        assert!(config.credentials.is_none());
        assert_eq!(config.user_stream.refresh_interval, Duration::from_secs(1800));
        assert_eq!(config.user_stream.reconnect_base, Duration::from_millis(2000));
        assert!(config.websocket.reconnect_on_drop);
        assert_eq!(config.symbols, vec!["BTCUSDT".to_string()]);
        assert!(config.correlation_id.is_none());
    }

    #[test]
    fn overrides_from_environment() {
        let config = config(&[
            ("BINANCE_WS_BASE_URL", "wss://testnet.binance.vision/ws/"),
            ("BINANCE_API_KEY", "key123"),
            ("BINANCE_USER_STREAM_REFRESH_SECS", "60"),
            ("BINANCE_WS_RECONNECT_ON_DROP", "false"),
            ("BINANCE_WS_MAX_RECONNECT_ATTEMPTS", "5"),
            ("BINANCE_SYMBOLS", "btcusdt, ethusdt,,"),
        ])
        .unwrap();

        assert_eq!(config.endpoints.ws_base_url, "wss://testnet.binance.vision/ws");
        assert_eq!(config.credentials.unwrap().api_key(), "key123");
        assert_eq!(config.user_stream.refresh_interval, Duration::from_secs(60));
        assert!(!config.websocket.reconnect_on_drop);
        assert_eq!(config.websocket.max_reconnect_attempts, 5);
        assert_eq!(config.symbols, vec!["BTCUSDT".to_string(), "ETHUSDT".to_string()]);
    }

    #[test]
    fn invalid_numbers_fall_back() {
        let config = config(&[
            ("BINANCE_HTTP_TIMEOUT_SECS", "soon"),
            ("BINANCE_WS_RECONNECT_DELAY_MULTIPLIER", "x"),
        ])
        .unwrap();
        assert_eq!(config.endpoints.http_timeout, Duration::from_secs(10));
        assert!((config.websocket.reconnect_delay_multiplier - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_bad_scheme() {
        let err = config(&[("BINANCE_WS_BASE_URL", "https://stream.binance.com")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl { .. }));
    }

    #[test]
    fn rejects_empty_symbols() {
        let err = config(&[("BINANCE_SYMBOLS", " , ")]).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyValue(_)));
    }

    #[test]
    fn empty_api_key_is_absent() {
        assert!(config(&[("BINANCE_API_KEY", "")]).unwrap().credentials.is_none());
    }

    #[test]
    fn credentials_redacted_debug() {
        let creds = Credentials::new("key123".to_string());
        let debug = format!("{creds:?}");
        assert!(!debug.contains("key123"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn user_stream_config_uses_ws_base() {
        let config = config(&[("BINANCE_WS_BASE_URL", "ws://localhost:9000/ws")]).unwrap();
        let user = config.user_stream_config();
        assert_eq!(user.base_url, "ws://localhost:9000/ws");
        assert_eq!(user.reconnect_base, Duration::from_millis(2000));
    }
}
