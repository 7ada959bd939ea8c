//! Normalized Event Types
//!
//! The stable event shapes handed to subscriber callbacks. Field names are
//! the descriptive forms of the wire protocol's short codes; price levels
//! are `{price, quantity}` records instead of two-element arrays.
//!
//! Every wire-sourced field is optional. A key missing from the payload is
//! `None` here and is omitted when the event is serialized, so the JSON
//! form of an event matches what the exchange actually sent.

use std::collections::BTreeMap;

use serde::Serialize;

/// `eventType` of every normalized account position update.
pub const ACCOUNT_EVENT_TYPE: &str = "account";

/// `eventType` of every normalized execution report.
pub const EXECUTION_REPORT_EVENT_TYPE: &str = "executionReport";

// =============================================================================
// Order Book
// =============================================================================

/// One order book level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceLevel {
    /// Price as sent by the exchange.
    pub price: String,
    /// Quantity as sent by the exchange.
    pub quantity: String,
}

/// Diff depth update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepthEvent {
    /// Event type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    /// Event time (ms).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_time: Option<u64>,
    /// Symbol.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    /// First update ID in event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_update_id: Option<u64>,
    /// Final update ID in event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_update_id: Option<u64>,
    /// Bid levels in wire order.
    pub bid_depth: Vec<PriceLevel>,
    /// Ask levels in wire order.
    pub ask_depth: Vec<PriceLevel>,
}

/// Partial book depth snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialDepthEvent {
    /// Symbol from the subscription request.
    pub symbol: String,
    /// Level from the subscription request.
    pub level: u32,
    /// Last update ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_update_id: Option<u64>,
    /// Bid levels in wire order.
    pub bids: Vec<PriceLevel>,
    /// Ask levels in wire order.
    pub asks: Vec<PriceLevel>,
}

// =============================================================================
// Candles
// =============================================================================

/// Candlestick update, flattened from the nested wire body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandleEvent {
    /// Event type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    /// Event time (ms).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_time: Option<u64>,
    /// Symbol.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    /// Candle open time (ms).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<u64>,
    /// Candle close time (ms).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close_time: Option<u64>,
    /// First trade ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_trade_id: Option<i64>,
    /// Last trade ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_trade_id: Option<i64>,
    /// Open price.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open: Option<String>,
    /// High price.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high: Option<String>,
    /// Low price.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low: Option<String>,
    /// Close price.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close: Option<String>,
    /// Base asset volume.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<String>,
    /// Number of trades in the candle.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trades: Option<u64>,
    /// Candle interval, e.g. `1m`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
    /// Whether the candle is closed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_final: Option<bool>,
    /// Quote asset volume.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote_volume: Option<String>,
    /// Taker buy base asset volume.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buy_volume: Option<String>,
    /// Taker buy quote asset volume.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote_buy_volume: Option<String>,
}

// =============================================================================
// Tickers
// =============================================================================

/// 24h rolling window ticker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TickerEvent {
    /// Event type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    /// Event time (ms).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_time: Option<u64>,
    /// Symbol.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    /// Price change.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_change: Option<String>,
    /// Price change percent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_change_percent: Option<String>,
    /// Weighted average price.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weighted_avg: Option<String>,
    /// First trade price before the window.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev_day_close: Option<String>,
    /// Last price.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cur_day_close: Option<String>,
    /// Last quantity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close_trade_quantity: Option<String>,
    /// Best bid price.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_bid: Option<String>,
    /// Best bid quantity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_bid_qnt: Option<String>,
    /// Best ask price.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_ask: Option<String>,
    /// Best ask quantity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_ask_qnt: Option<String>,
    /// Open price of the window.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open: Option<String>,
    /// High price of the window.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high: Option<String>,
    /// Low price of the window.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low: Option<String>,
    /// Total traded base asset volume.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<String>,
    /// Total traded quote asset volume.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_quote: Option<String>,
    /// Statistics open time (ms).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_time: Option<u64>,
    /// Statistics close time (ms).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close_time: Option<u64>,
    /// First trade ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_trade_id: Option<i64>,
    /// Last trade ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_trade_id: Option<i64>,
    /// Total number of trades.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_trades: Option<u64>,
}

// =============================================================================
// Trades
// =============================================================================

/// Trade or aggregate trade.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeEvent {
    /// Event type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    /// Event time (ms).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_time: Option<u64>,
    /// Symbol.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    /// Price.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    /// Quantity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<String>,
    /// Whether the buyer is the market maker.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maker: Option<bool>,
    /// Wire flag `M`, passed through as sent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_buyer_maker: Option<bool>,
    /// Aggregate trade ID; absent on raw trades.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trade_id: Option<u64>,
}

// =============================================================================
// User Data
// =============================================================================

/// Available and locked amounts of one asset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssetBalance {
    /// Free amount.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available: Option<String>,
    /// Locked amount.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked: Option<String>,
}

/// Account position update, balances keyed by asset code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountEvent {
    /// Always [`ACCOUNT_EVENT_TYPE`].
    pub event_type: String,
    /// Event time (ms).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_time: Option<u64>,
    /// Time of last account update (ms).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_account_update: Option<u64>,
    /// Balances by asset; a repeated asset keeps its last wire entry.
    pub balances: BTreeMap<String, AssetBalance>,
}

/// Order execution report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReportEvent {
    /// Always [`EXECUTION_REPORT_EVENT_TYPE`].
    pub event_type: String,
    /// Event time (ms).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_time: Option<u64>,
    /// Symbol.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    /// Client order ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_client_order_id: Option<String>,
    /// Original client order ID, set on cancels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_client_order_id: Option<String>,
    /// Order side.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub side: Option<String>,
    /// Order type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_type: Option<String>,
    /// Time in force.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_in_force: Option<String>,
    /// Order quantity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<String>,
    /// Order price.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    /// Current execution type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_type: Option<String>,
    /// Stop price.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_price: Option<String>,
    /// Iceberg quantity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iceberg_quantity: Option<String>,
    /// Current order status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_status: Option<String>,
    /// Reject reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_reject_reason: Option<String>,
    /// Order ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<u64>,
    /// Transaction time (ms).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_time: Option<u64>,
    /// Last executed quantity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_trade_quantity: Option<String>,
    /// Cumulative filled quantity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_trade_quantity: Option<String>,
    /// Last executed price.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_last_trade: Option<String>,
    /// Commission amount.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commission: Option<String>,
    /// Commission asset, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commission_asset: Option<String>,
    /// Trade ID, `-1` when nothing was filled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trade_id: Option<i64>,
    /// Whether the order is on the book.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_order_working: Option<bool>,
    /// Whether this trade is the maker side.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_buyer_maker: Option<bool>,
    /// Order creation time (ms).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<u64>,
    /// Cumulative quote asset transacted quantity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_quote_trade_quantity: Option<String>,
}

/// Any event delivered on the user data feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum UserEvent {
    /// `outboundAccountPosition`.
    Account(AccountEvent),
    /// `executionReport`.
    ExecutionReport(Box<ExecutionReportEvent>),
    /// Any event type without a registered transform: `type` plus every
    /// other wire field, unchanged.
    Other(serde_json::Map<String, serde_json::Value>),
}

impl UserEvent {
    /// The event type name: `account`, `executionReport`, or the `type`
    /// field of a passed-through event.
    #[must_use]
    pub fn kind(&self) -> Option<&str> {
        match self {
            Self::Account(event) => Some(&event.event_type),
            Self::ExecutionReport(event) => Some(&event.event_type),
            Self::Other(fields) => fields.get("type").and_then(serde_json::Value::as_str),
        }
    }
}
