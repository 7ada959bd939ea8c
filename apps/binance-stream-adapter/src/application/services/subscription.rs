//! Subscription Multiplexer
//!
//! Fans one logical subscription out into one physical connection per
//! symbol, decodes every frame through the feed's transform, and hands the
//! result to the caller's callback.
//!
//! # Delivery
//!
//! Frames on one connection reach the callback in transport order. There
//! is no ordering across the connections of one subscription. A frame
//! that fails to decode is logged and dropped; the connection stays open.

use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::application::ports::{
    CLOSE_HANDLE_REASON, CloseOptions, ConnectionHandlers, NORMAL_CLOSURE, StreamConnection,
    StreamConnector,
};
use crate::domain::codec::{CodecError, JsonCodec};
use crate::domain::events::{PartialDepthEvent, TickerEvent};
use crate::domain::subscription::{
    PartialDepthRequests, StreamKind, SymbolList, all_tickers_address, stream_address,
};

// =============================================================================
// Subscription Handle
// =============================================================================

/// Closes every connection opened for one subscription.
///
/// The handle holds the only reference to each connection, so dropping it
/// closes the whole subscription with code 1000.
#[must_use = "dropping the handle closes every connection of the subscription"]
pub struct SubscriptionHandle {
    connections: Vec<Arc<dyn StreamConnection>>,
}

impl SubscriptionHandle {
    /// Wrap the connections of one subscription.
    pub fn new(connections: Vec<Arc<dyn StreamConnection>>) -> Self {
        Self { connections }
    }

    /// Close every connection with code 1000 and `keep_closed` forced on.
    ///
    /// Every call reaches every connection; repeated calls rely on the
    /// connection's own close being idempotent.
    pub fn close(&self, options: CloseOptions) {
        let options = options.with_keep_closed();
        for connection in &self.connections {
            tracing::debug!(address = %connection.address(), "Closing feed connection");
            connection.close(NORMAL_CLOSURE, CLOSE_HANDLE_REASON, &options);
        }
    }

    /// Addresses of the underlying connections, in open order.
    #[must_use]
    pub fn addresses(&self) -> Vec<&str> {
        self.connections.iter().map(|c| c.address()).collect()
    }

    /// Number of underlying connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Whether the subscription opened no connections.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("addresses", &self.addresses())
            .finish()
    }
}

// =============================================================================
// Multiplexer
// =============================================================================

/// Opens and wires feed connections.
#[derive(Clone)]
pub struct Multiplexer {
    base_url: String,
    connector: Arc<dyn StreamConnector>,
    codec: JsonCodec,
}

impl Multiplexer {
    /// Create a multiplexer for feeds under `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>, connector: Arc<dyn StreamConnector>) -> Self {
        Self {
            base_url: base_url.into(),
            connector,
            codec: JsonCodec::new(),
        }
    }

    /// Base address of every feed.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Subscribe to a per-symbol feed whose frames decode as wire shape `W`.
    pub fn subscribe<W, E, C>(
        &self,
        symbols: SymbolList,
        kind: &StreamKind,
        callback: C,
    ) -> SubscriptionHandle
    where
        W: DeserializeOwned + Into<E> + 'static,
        E: 'static,
        C: Fn(E) + Send + Sync + 'static,
    {
        let callback = Arc::new(callback);
        let codec = self.codec;

        let connections = symbols
            .iter()
            .map(|symbol| {
                let callback = Arc::clone(&callback);
                self.open(
                    stream_address(&self.base_url, symbol, kind),
                    move |text| codec.decode::<W, E>(text),
                    move |event| callback(event),
                )
            })
            .collect();

        SubscriptionHandle::new(connections)
    }

    /// Subscribe to partial depth snapshots, one connection per request.
    pub fn subscribe_partial_depth<C>(
        &self,
        requests: PartialDepthRequests,
        callback: C,
    ) -> SubscriptionHandle
    where
        C: Fn(PartialDepthEvent) + Send + Sync + 'static,
    {
        let callback = Arc::new(callback);
        let codec = self.codec;

        let connections = requests
            .into_iter()
            .map(|request| {
                let callback = Arc::clone(&callback);
                let kind = StreamKind::PartialDepth {
                    level: request.level,
                };
                self.open(
                    stream_address(&self.base_url, &request.symbol, &kind),
                    move |text| codec.decode_partial_depth(&request, text),
                    move |event| callback(event),
                )
            })
            .collect();

        SubscriptionHandle::new(connections)
    }

    /// Subscribe to the all-symbols ticker feed over a single connection.
    pub fn subscribe_all_tickers<C>(&self, callback: C) -> SubscriptionHandle
    where
        C: Fn(Vec<TickerEvent>) + Send + Sync + 'static,
    {
        let codec = self.codec;
        let connection = self.open(
            all_tickers_address(&self.base_url),
            move |text| codec.decode_all_tickers(text),
            callback,
        );
        SubscriptionHandle::new(vec![connection])
    }

    fn open<E, D, C>(&self, address: String, decode: D, callback: C) -> Arc<dyn StreamConnection>
    where
        E: 'static,
        D: Fn(&str) -> Result<E, CodecError> + Send + Sync + 'static,
        C: Fn(E) + Send + Sync + 'static,
    {
        let message_address = address.clone();
        let close_address = address.clone();
        let error_address = address.clone();

        let handlers = ConnectionHandlers::new(move |text| match decode(text) {
            Ok(event) => callback(event),
            Err(e) => {
                tracing::warn!(
                    address = %message_address,
                    error = %e,
                    "Dropping undecodable frame"
                );
            }
        })
        .on_close(move |event| {
            tracing::debug!(
                address = %close_address,
                code = event.code,
                reason = %event.reason,
                "Feed connection closed"
            );
        })
        .on_error(move |error| {
            tracing::warn!(address = %error_address, error = %error, "Feed connection error");
        });

        tracing::debug!(address = %address, "Opening feed connection");
        self.connector.open(&address, handlers)
    }
}

impl std::fmt::Debug for Multiplexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Multiplexer")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::TradeEvent;
    use crate::domain::wire::RawTrade;
    use crate::infrastructure::mock::MockConnector;
    use parking_lot::Mutex;

    const BASE: &str = "wss://example.test/ws";

    #[test]
    fn one_connection_per_symbol() {
        let connector = Arc::new(MockConnector::new());
        let mux = Multiplexer::new(BASE, connector.clone());

        let handle = mux.subscribe::<RawTrade, TradeEvent, _>(
            SymbolList::from(["BNBBTC", "ETHBTC"]),
            &StreamKind::Trade,
            |_| {},
        );

        assert_eq!(handle.len(), 2);
        assert_eq!(
            connector.opened_addresses(),
            vec![
                "wss://example.test/ws/bnbbtc@trade".to_string(),
                "wss://example.test/ws/ethbtc@trade".to_string(),
            ]
        );
    }

    #[test]
    fn frames_reach_callback_in_order() {
        let connector = Arc::new(MockConnector::new());
        let mux = Multiplexer::new(BASE, connector.clone());
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);

        let _handle = mux.subscribe::<RawTrade, TradeEvent, _>(
            SymbolList::from("BNBBTC"),
            &StreamKind::AggTrade,
            move |event| sink.lock().push(event.trade_id),
        );

        let connection = connector.connection(0).unwrap();
        connection.emit(r#"{"e":"aggTrade","a":1}"#);
        connection.emit("not json");
        connection.emit(r#"{"e":"aggTrade","a":2}"#);

        assert_eq!(*received.lock(), vec![Some(1), Some(2)]);
    }

    #[test]
    fn dropping_handle_releases_connections() {
        let connector = Arc::new(MockConnector::new());
        let mux = Multiplexer::new(BASE, connector.clone());

        let handle = mux.subscribe_all_tickers(|_| {});
        let connection = connector.connection(0).unwrap();
        let held = Arc::strong_count(&connection);

        drop(handle);

        assert_eq!(Arc::strong_count(&connection), held - 1);
    }

    #[test]
    fn close_forces_keep_closed() {
        let connector = Arc::new(MockConnector::new());
        let mux = Multiplexer::new(BASE, connector.clone());

        let handle = mux.subscribe_all_tickers(|_| {});
        handle.close(CloseOptions::new().with("reason", "shutdown"));

        let closes = connector.connection(0).unwrap().closes();
        assert_eq!(closes.len(), 1);
        assert_eq!(closes[0].code, NORMAL_CLOSURE);
        assert_eq!(closes[0].reason, CLOSE_HANDLE_REASON);
        assert!(closes[0].options.keep_closed);
        assert_eq!(closes[0].options.extra["reason"], "shutdown");
    }
}
