//! Binance Stream Adapter Binary
//!
//! Subscribes to tickers and trades for the configured symbols, and to the
//! user data stream when an API key is present, logging every event.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin binance-stream-adapter
//! ```
//!
//! # Environment Variables
//!
//! ## Optional
//! - `BINANCE_SYMBOLS`: Comma separated symbols (default: BTCUSDT)
//! - `BINANCE_API_KEY`: Enables the user data stream
//! - `BINANCE_CORRELATION_ID`: User stream correlation id (default: random UUID)
//! - `BINANCE_WS_BASE_URL`: Streaming base address
//! - `BINANCE_REST_BASE_URL`: REST base address for session requests
//! - `RUST_LOG`: Log filter (default: `binance_stream_adapter=info`)

use std::sync::Arc;

use anyhow::Context;
use binance_stream_adapter::infrastructure::telemetry;
use binance_stream_adapter::{
    AdapterConfig, BinanceSessionClient, BinanceStreams, CloseOptions, SubscriptionHandle,
    TungsteniteConnector, UserStreamHandle,
};
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls crypto provider"))?;

    load_dotenv();
    telemetry::init();

    tracing::info!("Starting Binance Stream Adapter");

    let config = AdapterConfig::from_env().context("invalid configuration")?;
    log_config(&config);

    let connector = Arc::new(TungsteniteConnector::from_settings(&config.websocket));
    let mut streams = BinanceStreams::with_base_url(config.endpoints.ws_base_url.clone(), connector)
        .with_user_stream_config(config.user_stream_config());

    if config.credentials.is_some() {
        let session = BinanceSessionClient::from_config(&config)
            .context("failed to build session client")?;
        streams = streams.with_session(Arc::new(session));
    }

    let subscriptions = subscribe_market_data(&streams, &config.symbols);

    let user_stream = if config.credentials.is_some() {
        let correlation_id = config
            .correlation_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        Some(start_user_stream(&streams, correlation_id).await?)
    } else {
        tracing::info!("BINANCE_API_KEY not set, user data stream disabled");
        None
    };

    await_shutdown().await;

    for handle in &subscriptions {
        handle.close(CloseOptions::new());
    }
    if let Some(handle) = user_stream {
        handle.close(CloseOptions::new());
    }

    tracing::info!("Binance Stream Adapter stopped");
    Ok(())
}

/// Open ticker and trade feeds for every configured symbol.
fn subscribe_market_data(streams: &BinanceStreams, symbols: &[String]) -> Vec<SubscriptionHandle> {
    let tickers = streams.ticker(symbols, |event| {
        tracing::info!(
            symbol = event.symbol.as_deref().unwrap_or_default(),
            close = event.cur_day_close.as_deref().unwrap_or_default(),
            "Ticker"
        );
    });

    let trades = streams.trades(symbols, |event| {
        tracing::info!(
            symbol = event.symbol.as_deref().unwrap_or_default(),
            price = event.price.as_deref().unwrap_or_default(),
            quantity = event.quantity.as_deref().unwrap_or_default(),
            "Trade"
        );
    });

    vec![tickers, trades]
}

async fn start_user_stream(
    streams: &BinanceStreams,
    correlation_id: String,
) -> anyhow::Result<UserStreamHandle> {
    let handle = streams
        .user(
            |event| match serde_json::to_string(&event) {
                Ok(json) => tracing::info!(event = %json, "User event"),
                Err(e) => tracing::warn!(error = %e, "Failed to serialize user event"),
            },
            correlation_id,
        )
        .await
        .context("user data stream failed to start")?;

    tracing::info!(correlation_id = handle.correlation_id(), "User data stream started");
    Ok(handle)
}

/// Log the parsed configuration.
fn log_config(config: &AdapterConfig) {
    tracing::info!(
        symbols = ?config.symbols,
        user_stream = config.credentials.is_some(),
        reconnect_on_drop = config.websocket.reconnect_on_drop,
        "Configuration loaded"
    );
    tracing::debug!(
        ws_base_url = %config.endpoints.ws_base_url,
        rest_base_url = %config.endpoints.rest_base_url,
        "Endpoints"
    );
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        for dir in cwd.ancestors().skip(1) {
            let env_path = dir.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
async fn await_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}
