//! Feed Subscription Integration Tests
//!
//! Drives the public feed operations against the in-memory connector:
//! addresses opened, events delivered, handles closed.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use parking_lot::Mutex;
use proptest::prelude::*;
use test_case::test_case;

use binance_stream_adapter::application::ports::{CLOSE_HANDLE_REASON, NORMAL_CLOSURE};
use binance_stream_adapter::infrastructure::mock::MockConnector;
use binance_stream_adapter::{
    BinanceStreams, CandleEvent, CloseOptions, FeedError, PartialDepthRequest, PriceLevel,
    TickerEvent, TradeEvent,
};

const BASE: &str = "wss://stream.example.test:9443/ws";

fn setup() -> (Arc<MockConnector>, BinanceStreams) {
    let connector = Arc::new(MockConnector::new());
    let streams = BinanceStreams::with_base_url(BASE, connector.clone());
    (connector, streams)
}

fn level(price: &str, quantity: &str) -> PriceLevel {
    PriceLevel {
        price: price.to_string(),
        quantity: quantity.to_string(),
    }
}

#[test_case("trade" ; "trades")]
#[test_case("aggTrade" ; "aggregate trades")]
#[test_case("ticker" ; "tickers")]
#[test_case("depth" ; "diff depth")]
fn opens_one_lowercase_address_per_symbol(suffix: &str) {
    let (connector, streams) = setup();
    let symbols = ["BNBBTC", "ETHBTC", "LtcBtc"];

    let handle = match suffix {
        "trade" => streams.trades(symbols, |_| {}),
        "aggTrade" => streams.agg_trades(symbols, |_| {}),
        "ticker" => streams.ticker(symbols, |_| {}),
        _ => streams.depth(symbols, |_| {}),
    };

    assert_eq!(handle.len(), 3);
    assert_eq!(
        connector.opened_addresses(),
        vec![
            format!("{BASE}/bnbbtc@{suffix}"),
            format!("{BASE}/ethbtc@{suffix}"),
            format!("{BASE}/ltcbtc@{suffix}"),
        ]
    );
}

#[test]
fn close_reaches_every_connection() {
    let (connector, streams) = setup();
    let handle = streams.trades(["BNBBTC", "ETHBTC"], |_| {});

    handle.close(CloseOptions::new().with("delay", 250));

    for index in 0..2 {
        let closes = connector.connection(index).unwrap().closes();
        assert_eq!(closes.len(), 1);
        assert_eq!(closes[0].code, NORMAL_CLOSURE);
        assert_eq!(closes[0].reason, CLOSE_HANDLE_REASON);
        assert!(closes[0].options.keep_closed);
        assert_eq!(closes[0].options.extra["delay"], 250);
    }
}

#[test]
fn close_twice_closes_twice() {
    let (connector, streams) = setup();
    let handle = streams.ticker("BNBBTC", |_| {});

    handle.close(CloseOptions::new());
    handle.close(CloseOptions::new());

    assert_eq!(connector.connection(0).unwrap().closes().len(), 2);
}

#[test]
fn invalid_candles_open_nothing() {
    let (connector, streams) = setup();

    let result = streams.candles("BNBBTC", None, Some(|_: CandleEvent| {}));

    assert_eq!(
        result.unwrap_err(),
        FeedError::InvalidArgument("please pass symbols, interval, and callback")
    );
    assert!(connector.opened_addresses().is_empty());
}

#[test]
fn candles_flatten_kline_body() {
    let (connector, streams) = setup();
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);

    let _handle = streams
        .candles("BNBBTC", Some("1m"), Some(move |event| sink.lock().push(event)))
        .unwrap();
    assert_eq!(connector.opened_addresses(), vec![format!("{BASE}/bnbbtc@kline_1m")]);

    connector.connection(0).unwrap().emit(
        r#"{"e":"kline","E":123456789,"s":"BNBBTC","k":{"t":123400000,"T":123460000,
        "s":"BNBBTC","i":"1m","f":100,"L":200,"o":"0.0010","c":"0.0020","h":"0.0025",
        "l":"0.0015","v":"1000","n":100,"x":false,"q":"1.0000","V":"500","Q":"0.500","B":"123456"}}"#,
    );

    let received = received.lock();
    assert_eq!(received.len(), 1);
    let candle = &received[0];
    assert_eq!(candle.event_type.as_deref(), Some("kline"));
    assert_eq!(candle.symbol.as_deref(), Some("BNBBTC"));
    assert_eq!(candle.interval.as_deref(), Some("1m"));
    assert_eq!(candle.open.as_deref(), Some("0.0010"));
    assert_eq!(candle.close.as_deref(), Some("0.0020"));
    assert_eq!(candle.trades, Some(100));
    assert_eq!(candle.is_final, Some(false));
    assert_eq!(candle.buy_volume.as_deref(), Some("500"));
}

#[test]
fn partial_depth_echoes_request() {
    let (connector, streams) = setup();
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);

    let _handle = streams.partial_depth(
        vec![PartialDepthRequest::new("BNBBTC", 5), PartialDepthRequest::new("ETHBTC", 10)],
        move |event| sink.lock().push(event),
    );

    assert_eq!(
        connector.opened_addresses(),
        vec![format!("{BASE}/bnbbtc@depth5"), format!("{BASE}/ethbtc@depth10")]
    );

    connector.connection(1).unwrap().emit(
        r#"{"lastUpdateId":160,"bids":[["0.0024","10"]],"asks":[["0.0026","100"],["0.0027","5"]]}"#,
    );

    let received = received.lock();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].symbol, "ETHBTC");
    assert_eq!(received[0].level, 10);
    assert_eq!(received[0].last_update_id, Some(160));
    assert_eq!(received[0].bids, vec![level("0.0024", "10")]);
    assert_eq!(
        received[0].asks,
        vec![level("0.0026", "100"), level("0.0027", "5")]
    );
}

#[test]
fn depth_levels_keep_wire_order() {
    let (connector, streams) = setup();
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);

    let _handle = streams.depth("BNBBTC", move |event| sink.lock().push(event));
    connector.connection(0).unwrap().emit(
        r#"{"e":"depthUpdate","E":1,"s":"BNBBTC","U":157,"u":160,
        "b":[["0.0024","10"],["0.0023","3"]],"a":[["0.0026","100"]]}"#,
    );

    let received = received.lock();
    assert_eq!(received[0].first_update_id, Some(157));
    assert_eq!(received[0].final_update_id, Some(160));
    assert_eq!(
        received[0].bid_depth,
        vec![level("0.0024", "10"), level("0.0023", "3")]
    );
    assert_eq!(received[0].ask_depth, vec![level("0.0026", "100")]);
}

#[test]
fn trades_map_aggregate_id() {
    let (connector, streams) = setup();
    let received: Arc<Mutex<Vec<TradeEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);

    let _handle = streams.agg_trades("BNBBTC", move |event| sink.lock().push(event));
    connector.connection(0).unwrap().emit(
        r#"{"e":"aggTrade","E":123456789,"s":"BNBBTC","a":12345,"p":"0.001","q":"100",
        "f":100,"l":105,"T":123456785,"m":true,"M":true}"#,
    );

    let received = received.lock();
    assert_eq!(received[0].trade_id, Some(12345));
    assert_eq!(received[0].price.as_deref(), Some("0.001"));
    assert_eq!(received[0].maker, Some(true));
    assert_eq!(received[0].is_buyer_maker, Some(true));
}

#[test]
fn all_tickers_use_one_connection() {
    let (connector, streams) = setup();
    let received: Arc<Mutex<Vec<Vec<TickerEvent>>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);

    let handle = streams.all_tickers(move |events| sink.lock().push(events));
    assert_eq!(handle.len(), 1);
    assert_eq!(connector.opened_addresses(), vec![format!("{BASE}/!ticker@arr")]);

    connector
        .connection(0)
        .unwrap()
        .emit(r#"[{"e":"24hrTicker","s":"BNBBTC","c":"0.0025"},{"e":"24hrTicker","s":"ETHBTC"}]"#);

    let received = received.lock();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].len(), 2);
    assert_eq!(received[0][0].cur_day_close.as_deref(), Some("0.0025"));
    assert_eq!(received[0][1].symbol.as_deref(), Some("ETHBTC"));
}

#[test]
fn malformed_frames_are_dropped() {
    let (connector, streams) = setup();
    let count = Arc::new(Mutex::new(0_usize));
    let sink = Arc::clone(&count);

    let _handle = streams.ticker("BNBBTC", move |_| *sink.lock() += 1);
    let connection = connector.connection(0).unwrap();
    connection.emit("{not json");
    connection.emit(r#"{"e":"24hrTicker","E":"not a number"}"#);
    connection.emit(r#"{"e":"24hrTicker","s":"BNBBTC"}"#);

    assert_eq!(*count.lock(), 1);
    assert!(connection.closes().is_empty());
}

proptest! {
    #[test]
    fn addresses_are_lowercase(symbol in "[A-Za-z0-9]{1,12}") {
        let (connector, streams) = setup();
        let _handle = streams.trades(symbol.as_str(), |_| {});

        let addresses = connector.opened_addresses();
        prop_assert_eq!(addresses.len(), 1);
        prop_assert_eq!(
            addresses[0].clone(),
            format!("{BASE}/{}@trade", symbol.to_lowercase())
        );
    }
}
