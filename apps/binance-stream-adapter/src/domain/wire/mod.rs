//! Binance Wire Message Types
//!
//! Raw payload shapes exactly as the exchange sends them, keyed by the
//! protocol's short field codes. Every field is optional: a key missing
//! from the payload becomes `None` and flows through the transform layer
//! as an absent field rather than a decoding error.
//!
//! # References
//!
//! - [WebSocket Streams](https://developers.binance.com/docs/binance-spot-api-docs/web-socket-streams)
//! - [User Data Streams](https://developers.binance.com/docs/binance-spot-api-docs/user-data-stream)

use serde::Deserialize;

// =============================================================================
// Order Book
// =============================================================================

/// A `[price, quantity]` pair as sent on depth feeds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawPriceLevel(pub String, pub String);

/// Diff depth update (`<symbol>@depth`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDepthUpdate {
    /// Event type.
    #[serde(rename = "e")]
    pub event_type: Option<String>,
    /// Event time (ms).
    #[serde(rename = "E")]
    pub event_time: Option<u64>,
    /// Symbol.
    #[serde(rename = "s")]
    pub symbol: Option<String>,
    /// First update ID in event.
    #[serde(rename = "U")]
    pub first_update_id: Option<u64>,
    /// Final update ID in event.
    #[serde(rename = "u")]
    pub final_update_id: Option<u64>,
    /// Bids to be updated.
    #[serde(rename = "b", default)]
    pub bids: Vec<RawPriceLevel>,
    /// Asks to be updated.
    #[serde(rename = "a", default)]
    pub asks: Vec<RawPriceLevel>,
}

/// Partial book depth snapshot (`<symbol>@depth<level>`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPartialDepth {
    /// Last update ID.
    pub last_update_id: Option<u64>,
    /// Bids, best first.
    #[serde(default)]
    pub bids: Vec<RawPriceLevel>,
    /// Asks, best first.
    #[serde(default)]
    pub asks: Vec<RawPriceLevel>,
}

// =============================================================================
// Candles
// =============================================================================

/// Candlestick event (`<symbol>@kline_<interval>`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawKlineEvent {
    /// Event type.
    #[serde(rename = "e")]
    pub event_type: Option<String>,
    /// Event time (ms).
    #[serde(rename = "E")]
    pub event_time: Option<u64>,
    /// Symbol.
    #[serde(rename = "s")]
    pub symbol: Option<String>,
    /// The candle itself.
    #[serde(rename = "k", default)]
    pub kline: RawKline,
}

/// Candle body nested under `k`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawKline {
    /// Candle open time (ms).
    #[serde(rename = "t")]
    pub start_time: Option<u64>,
    /// Candle close time (ms).
    #[serde(rename = "T")]
    pub close_time: Option<u64>,
    /// First trade ID.
    #[serde(rename = "f")]
    pub first_trade_id: Option<i64>,
    /// Last trade ID.
    #[serde(rename = "L")]
    pub last_trade_id: Option<i64>,
    /// Open price.
    #[serde(rename = "o")]
    pub open: Option<String>,
    /// High price.
    #[serde(rename = "h")]
    pub high: Option<String>,
    /// Low price.
    #[serde(rename = "l")]
    pub low: Option<String>,
    /// Close price.
    #[serde(rename = "c")]
    pub close: Option<String>,
    /// Base asset volume.
    #[serde(rename = "v")]
    pub volume: Option<String>,
    /// Number of trades.
    #[serde(rename = "n")]
    pub trades: Option<u64>,
    /// Candle interval, e.g. `1m`.
    #[serde(rename = "i")]
    pub interval: Option<String>,
    /// Whether the candle is closed.
    #[serde(rename = "x")]
    pub is_final: Option<bool>,
    /// Quote asset volume.
    #[serde(rename = "q")]
    pub quote_volume: Option<String>,
    /// Taker buy base asset volume.
    #[serde(rename = "V")]
    pub buy_volume: Option<String>,
    /// Taker buy quote asset volume.
    #[serde(rename = "Q")]
    pub quote_buy_volume: Option<String>,
}

// =============================================================================
// Tickers
// =============================================================================

/// 24h rolling window ticker (`<symbol>@ticker`, elements of `!ticker@arr`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTicker {
    /// Event type.
    #[serde(rename = "e")]
    pub event_type: Option<String>,
    /// Event time (ms).
    #[serde(rename = "E")]
    pub event_time: Option<u64>,
    /// Symbol.
    #[serde(rename = "s")]
    pub symbol: Option<String>,
    /// Price change.
    #[serde(rename = "p")]
    pub price_change: Option<String>,
    /// Price change percent.
    #[serde(rename = "P")]
    pub price_change_percent: Option<String>,
    /// Weighted average price.
    #[serde(rename = "w")]
    pub weighted_avg: Option<String>,
    /// First trade price before the window.
    #[serde(rename = "x")]
    pub prev_day_close: Option<String>,
    /// Last price.
    #[serde(rename = "c")]
    pub cur_day_close: Option<String>,
    /// Last quantity.
    #[serde(rename = "Q")]
    pub close_trade_quantity: Option<String>,
    /// Best bid price.
    #[serde(rename = "b")]
    pub best_bid: Option<String>,
    /// Best bid quantity.
    #[serde(rename = "B")]
    pub best_bid_qnt: Option<String>,
    /// Best ask price.
    #[serde(rename = "a")]
    pub best_ask: Option<String>,
    /// Best ask quantity.
    #[serde(rename = "A")]
    pub best_ask_qnt: Option<String>,
    /// Open price of the window.
    #[serde(rename = "o")]
    pub open: Option<String>,
    /// High price of the window.
    #[serde(rename = "h")]
    pub high: Option<String>,
    /// Low price of the window.
    #[serde(rename = "l")]
    pub low: Option<String>,
    /// Total traded base asset volume.
    #[serde(rename = "v")]
    pub volume: Option<String>,
    /// Total traded quote asset volume.
    #[serde(rename = "q")]
    pub volume_quote: Option<String>,
    /// Statistics open time (ms).
    #[serde(rename = "O")]
    pub open_time: Option<u64>,
    /// Statistics close time (ms).
    #[serde(rename = "C")]
    pub close_time: Option<u64>,
    /// First trade ID.
    #[serde(rename = "F")]
    pub first_trade_id: Option<i64>,
    /// Last trade ID.
    #[serde(rename = "L")]
    pub last_trade_id: Option<i64>,
    /// Total number of trades.
    #[serde(rename = "n")]
    pub total_trades: Option<u64>,
}

// =============================================================================
// Trades
// =============================================================================

/// Trade or aggregate trade event (`<symbol>@trade`, `<symbol>@aggTrade`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTrade {
    /// Event type.
    #[serde(rename = "e")]
    pub event_type: Option<String>,
    /// Event time (ms).
    #[serde(rename = "E")]
    pub event_time: Option<u64>,
    /// Symbol.
    #[serde(rename = "s")]
    pub symbol: Option<String>,
    /// Price.
    #[serde(rename = "p")]
    pub price: Option<String>,
    /// Quantity.
    #[serde(rename = "q")]
    pub quantity: Option<String>,
    /// Whether the buyer is the market maker.
    #[serde(rename = "m")]
    pub maker: Option<bool>,
    /// Wire flag `M`, passed through as sent.
    #[serde(rename = "M")]
    pub is_buyer_maker: Option<bool>,
    /// Aggregate trade ID; absent on raw trades.
    #[serde(rename = "a")]
    pub trade_id: Option<u64>,
}

// =============================================================================
// User Data
// =============================================================================

/// Account position update (`outboundAccountPosition`), discriminator removed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAccountPosition {
    /// Event time (ms).
    #[serde(rename = "E")]
    pub event_time: Option<u64>,
    /// Time of last account update.
    #[serde(rename = "u")]
    pub last_account_update: Option<u64>,
    /// Balances changed by the event, in wire order.
    #[serde(rename = "B", default)]
    pub balances: Vec<RawBalance>,
}

/// One balance entry of an account position update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawBalance {
    /// Asset code.
    #[serde(rename = "a")]
    pub asset: Option<String>,
    /// Free amount.
    #[serde(rename = "f")]
    pub free: Option<String>,
    /// Locked amount.
    #[serde(rename = "l")]
    pub locked: Option<String>,
}

/// Order execution report (`executionReport`), discriminator removed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawExecutionReport {
    /// Event time (ms).
    #[serde(rename = "E")]
    pub event_time: Option<u64>,
    /// Symbol.
    #[serde(rename = "s")]
    pub symbol: Option<String>,
    /// Client order ID.
    #[serde(rename = "c")]
    pub new_client_order_id: Option<String>,
    /// Original client order ID, set on cancels.
    #[serde(rename = "C")]
    pub original_client_order_id: Option<String>,
    /// Order side.
    #[serde(rename = "S")]
    pub side: Option<String>,
    /// Order type.
    #[serde(rename = "o")]
    pub order_type: Option<String>,
    /// Time in force.
    #[serde(rename = "f")]
    pub time_in_force: Option<String>,
    /// Order quantity.
    #[serde(rename = "q")]
    pub quantity: Option<String>,
    /// Order price.
    #[serde(rename = "p")]
    pub price: Option<String>,
    /// Current execution type.
    #[serde(rename = "x")]
    pub execution_type: Option<String>,
    /// Stop price.
    #[serde(rename = "P")]
    pub stop_price: Option<String>,
    /// Iceberg quantity.
    #[serde(rename = "F")]
    pub iceberg_quantity: Option<String>,
    /// Current order status.
    #[serde(rename = "X")]
    pub order_status: Option<String>,
    /// Reject reason.
    #[serde(rename = "r")]
    pub order_reject_reason: Option<String>,
    /// Order ID.
    #[serde(rename = "i")]
    pub order_id: Option<u64>,
    /// Transaction time (ms).
    #[serde(rename = "T")]
    pub order_time: Option<u64>,
    /// Last executed quantity.
    #[serde(rename = "l")]
    pub last_trade_quantity: Option<String>,
    /// Cumulative filled quantity.
    #[serde(rename = "z")]
    pub total_trade_quantity: Option<String>,
    /// Last executed price.
    #[serde(rename = "L")]
    pub price_last_trade: Option<String>,
    /// Commission amount.
    #[serde(rename = "n")]
    pub commission: Option<String>,
    /// Commission asset, if any.
    #[serde(rename = "N")]
    pub commission_asset: Option<String>,
    /// Trade ID, `-1` when nothing was filled.
    #[serde(rename = "t")]
    pub trade_id: Option<i64>,
    /// Whether the order is on the book.
    #[serde(rename = "w")]
    pub is_order_working: Option<bool>,
    /// Whether this trade is the maker side.
    #[serde(rename = "m")]
    pub is_buyer_maker: Option<bool>,
    /// Order creation time (ms).
    #[serde(rename = "O")]
    pub creation_time: Option<u64>,
    /// Cumulative quote asset transacted quantity.
    #[serde(rename = "Z")]
    pub total_quote_trade_quantity: Option<String>,
}
