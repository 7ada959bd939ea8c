//! Feed Facade
//!
//! The public set of named feed operations. Each one is a thin call into
//! the [`Multiplexer`] or the [`UserStreamManager`].

use std::sync::Arc;

use super::subscription::{Multiplexer, SubscriptionHandle};
use super::user_stream::{UserStreamConfig, UserStreamHandle, UserStreamManager};
use crate::application::ports::{SessionPort, StreamConnector};
use crate::domain::events::{
    CandleEvent, DepthEvent, PartialDepthEvent, TickerEvent, TradeEvent, UserEvent,
};
use crate::domain::subscription::{DEFAULT_BASE_URL, PartialDepthRequests, StreamKind, SymbolList};
use crate::domain::wire::{RawDepthUpdate, RawKlineEvent, RawTicker, RawTrade};

/// Feed operation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeedError {
    /// A required argument was missing; nothing was opened.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// The user feed needs a session client and none was configured.
    #[error("user feed requires a session client")]
    MissingSession,

    /// The user stream ended before its first connection.
    #[error("user stream stopped before connecting")]
    UserStreamStopped,
}

/// Binance feed subscriptions.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use binance_stream_adapter::{BinanceStreams, CloseOptions, TungsteniteConnector};
///
/// # async fn example() {
/// let streams = BinanceStreams::new(Arc::new(TungsteniteConnector::default()));
/// let handle = streams.ticker(["BTCUSDT", "ETHUSDT"], |event| {
///     println!("{:?} {:?}", event.symbol, event.cur_day_close);
/// });
///
/// // Later
/// handle.close(CloseOptions::new());
/// # }
/// ```
#[derive(Clone)]
pub struct BinanceStreams {
    multiplexer: Multiplexer,
    connector: Arc<dyn StreamConnector>,
    session: Option<Arc<dyn SessionPort>>,
    user_config: UserStreamConfig,
}

impl BinanceStreams {
    /// Market data feeds on the production endpoint.
    #[must_use]
    pub fn new(connector: Arc<dyn StreamConnector>) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, connector)
    }

    /// Market data feeds under a custom base address.
    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>, connector: Arc<dyn StreamConnector>) -> Self {
        let base_url = base_url.into();
        Self {
            multiplexer: Multiplexer::new(base_url.clone(), Arc::clone(&connector)),
            connector,
            session: None,
            user_config: UserStreamConfig::with_base_url(base_url),
        }
    }

    /// Enable the user feed with a session client.
    #[must_use]
    pub fn with_session(mut self, session: Arc<dyn SessionPort>) -> Self {
        self.session = Some(session);
        self
    }

    /// Override user stream timings. The base address always follows the
    /// market data feeds.
    #[must_use]
    pub fn with_user_stream_config(mut self, config: UserStreamConfig) -> Self {
        self.user_config = UserStreamConfig {
            base_url: self.multiplexer.base_url().to_string(),
            ..config
        };
        self
    }

    /// Base address of every feed.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.multiplexer.base_url()
    }

    /// Diff depth updates.
    ///
    /// Dropping the returned handle closes the feed.
    pub fn depth<F>(&self, symbols: impl Into<SymbolList>, callback: F) -> SubscriptionHandle
    where
        F: Fn(DepthEvent) + Send + Sync + 'static,
    {
        self.multiplexer
            .subscribe::<RawDepthUpdate, _, _>(symbols.into(), &StreamKind::Depth, callback)
    }

    /// Partial book depth snapshots, one connection per symbol and level.
    ///
    /// Dropping the returned handle closes the feed.
    pub fn partial_depth<F>(
        &self,
        requests: impl Into<PartialDepthRequests>,
        callback: F,
    ) -> SubscriptionHandle
    where
        F: Fn(PartialDepthEvent) + Send + Sync + 'static,
    {
        self.multiplexer.subscribe_partial_depth(requests.into(), callback)
    }

    /// Candlesticks at `interval`.
    ///
    /// Fails before opening anything when the interval is missing or empty,
    /// or when no callback is given. Dropping the returned handle closes the
    /// feed.
    pub fn candles<F>(
        &self,
        symbols: impl Into<SymbolList>,
        interval: Option<&str>,
        callback: Option<F>,
    ) -> Result<SubscriptionHandle, FeedError>
    where
        F: Fn(CandleEvent) + Send + Sync + 'static,
    {
        let (Some(interval), Some(callback)) = (interval.filter(|i| !i.is_empty()), callback)
        else {
            return Err(FeedError::InvalidArgument(
                "please pass symbols, interval, and callback",
            ));
        };

        let kind = StreamKind::Kline {
            interval: interval.to_string(),
        };
        Ok(self
            .multiplexer
            .subscribe::<RawKlineEvent, _, _>(symbols.into(), &kind, callback))
    }

    /// Raw trades.
    ///
    /// Dropping the returned handle closes the feed.
    pub fn trades<F>(&self, symbols: impl Into<SymbolList>, callback: F) -> SubscriptionHandle
    where
        F: Fn(TradeEvent) + Send + Sync + 'static,
    {
        self.multiplexer
            .subscribe::<RawTrade, _, _>(symbols.into(), &StreamKind::Trade, callback)
    }

    /// Aggregate trades.
    ///
    /// Dropping the returned handle closes the feed.
    pub fn agg_trades<F>(&self, symbols: impl Into<SymbolList>, callback: F) -> SubscriptionHandle
    where
        F: Fn(TradeEvent) + Send + Sync + 'static,
    {
        self.multiplexer
            .subscribe::<RawTrade, _, _>(symbols.into(), &StreamKind::AggTrade, callback)
    }

    /// 24h rolling tickers.
    ///
    /// Dropping the returned handle closes the feed.
    pub fn ticker<F>(&self, symbols: impl Into<SymbolList>, callback: F) -> SubscriptionHandle
    where
        F: Fn(TickerEvent) + Send + Sync + 'static,
    {
        self.multiplexer
            .subscribe::<RawTicker, _, _>(symbols.into(), &StreamKind::Ticker, callback)
    }

    /// Tickers of every symbol, delivered as one batch per frame.
    ///
    /// Dropping the returned handle closes the feed.
    pub fn all_tickers<F>(&self, callback: F) -> SubscriptionHandle
    where
        F: Fn(Vec<TickerEvent>) + Send + Sync + 'static,
    {
        self.multiplexer.subscribe_all_tickers(callback)
    }

    /// Authenticated user data events.
    ///
    /// Resolves once the first connection is open. Acquisition and refresh
    /// failures are retried internally and never surface here. The stream
    /// outlives a dropped handle; close it through the handle.
    pub async fn user<F>(
        &self,
        callback: F,
        correlation_id: impl Into<String>,
    ) -> Result<UserStreamHandle, FeedError>
    where
        F: Fn(UserEvent) + Send + Sync + 'static,
    {
        let session = self.session.clone().ok_or(FeedError::MissingSession)?;

        let manager = UserStreamManager::new(
            self.user_config.clone(),
            Arc::clone(&self.connector),
            session,
            correlation_id,
            callback,
        );

        manager
            .spawn()
            .await
            .map_err(|_| FeedError::UserStreamStopped)
    }
}

impl std::fmt::Debug for BinanceStreams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinanceStreams")
            .field("base_url", &self.base_url())
            .field("user_feed", &self.session.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mock::MockConnector;

    #[test]
    fn candles_require_interval() {
        let connector = Arc::new(MockConnector::new());
        let streams = BinanceStreams::with_base_url("wss://example.test/ws", connector.clone());

        let missing = streams.candles("BNBBTC", None, Some(|_: CandleEvent| {}));
        let empty = streams.candles("BNBBTC", Some(""), Some(|_: CandleEvent| {}));

        assert!(matches!(missing, Err(FeedError::InvalidArgument(_))));
        assert!(matches!(empty, Err(FeedError::InvalidArgument(_))));
        assert!(connector.opened_addresses().is_empty());
    }

    #[test]
    fn candles_require_callback() {
        let connector = Arc::new(MockConnector::new());
        let streams = BinanceStreams::with_base_url("wss://example.test/ws", connector.clone());

        let result = streams.candles("BNBBTC", Some("1m"), None::<fn(CandleEvent)>);

        assert_eq!(
            result.unwrap_err(),
            FeedError::InvalidArgument("please pass symbols, interval, and callback")
        );
        assert!(connector.opened_addresses().is_empty());
    }

    #[tokio::test]
    async fn user_feed_without_session() {
        let streams = BinanceStreams::new(Arc::new(MockConnector::new()));
        let result = streams.user(|_| {}, "id").await;
        assert_eq!(result.unwrap_err(), FeedError::MissingSession);
    }

    #[test]
    fn user_config_follows_base_url() {
        let connector = Arc::new(MockConnector::new());
        let streams = BinanceStreams::with_base_url("wss://a.test/ws", connector)
            .with_user_stream_config(UserStreamConfig::with_base_url("wss://b.test/ws"));
        assert_eq!(streams.user_config.base_url, "wss://a.test/ws");
    }
}
