//! Field Transforms
//!
//! Pure conversions from wire shapes to normalized events, one per feed
//! type. Nothing here validates: absent wire fields stay absent.
//!
//! User data events go through [`transform_user_event`], which looks the
//! `e` discriminator up in [`USER_TRANSFORMS`] and passes unregistered
//! event types through with only `e` renamed to `type`.

use serde_json::{Map, Value};

use crate::domain::events::{
    ACCOUNT_EVENT_TYPE, AccountEvent, AssetBalance, CandleEvent, DepthEvent,
    EXECUTION_REPORT_EVENT_TYPE, ExecutionReportEvent, PartialDepthEvent, PriceLevel,
    TickerEvent, TradeEvent, UserEvent,
};
use crate::domain::subscription::PartialDepthRequest;
use crate::domain::wire::{
    RawAccountPosition, RawDepthUpdate, RawExecutionReport, RawKlineEvent, RawPartialDepth,
    RawPriceLevel, RawTicker, RawTrade,
};

/// Transform applied to a user event's fields once `e` has been removed.
pub type UserTransform = fn(Map<String, Value>) -> Result<UserEvent, serde_json::Error>;

/// User event types with a dedicated transform.
pub const USER_TRANSFORMS: &[(&str, UserTransform)] = &[
    ("outboundAccountPosition", account_position),
    ("executionReport", execution_report),
];

// =============================================================================
// Order Book
// =============================================================================

impl From<RawPriceLevel> for PriceLevel {
    fn from(RawPriceLevel(price, quantity): RawPriceLevel) -> Self {
        Self { price, quantity }
    }
}

fn levels(raw: Vec<RawPriceLevel>) -> Vec<PriceLevel> {
    raw.into_iter().map(PriceLevel::from).collect()
}

impl From<RawDepthUpdate> for DepthEvent {
    fn from(raw: RawDepthUpdate) -> Self {
        Self {
            event_type: raw.event_type,
            event_time: raw.event_time,
            symbol: raw.symbol,
            first_update_id: raw.first_update_id,
            final_update_id: raw.final_update_id,
            bid_depth: levels(raw.bids),
            ask_depth: levels(raw.asks),
        }
    }
}

impl PartialDepthEvent {
    /// Build a partial depth event from the request that opened the feed
    /// and one snapshot received on it.
    #[must_use]
    pub fn from_snapshot(request: &PartialDepthRequest, raw: RawPartialDepth) -> Self {
        Self {
            symbol: request.symbol.clone(),
            level: request.level,
            last_update_id: raw.last_update_id,
            bids: levels(raw.bids),
            asks: levels(raw.asks),
        }
    }
}

// =============================================================================
// Candles, Tickers, Trades
// =============================================================================

impl From<RawKlineEvent> for CandleEvent {
    fn from(raw: RawKlineEvent) -> Self {
        let k = raw.kline;
        Self {
            event_type: raw.event_type,
            event_time: raw.event_time,
            symbol: raw.symbol,
            start_time: k.start_time,
            close_time: k.close_time,
            first_trade_id: k.first_trade_id,
            last_trade_id: k.last_trade_id,
            open: k.open,
            high: k.high,
            low: k.low,
            close: k.close,
            volume: k.volume,
            trades: k.trades,
            interval: k.interval,
            is_final: k.is_final,
            quote_volume: k.quote_volume,
            buy_volume: k.buy_volume,
            quote_buy_volume: k.quote_buy_volume,
        }
    }
}

impl From<RawTicker> for TickerEvent {
    fn from(raw: RawTicker) -> Self {
        Self {
            event_type: raw.event_type,
            event_time: raw.event_time,
            symbol: raw.symbol,
            price_change: raw.price_change,
            price_change_percent: raw.price_change_percent,
            weighted_avg: raw.weighted_avg,
            prev_day_close: raw.prev_day_close,
            cur_day_close: raw.cur_day_close,
            close_trade_quantity: raw.close_trade_quantity,
            best_bid: raw.best_bid,
            best_bid_qnt: raw.best_bid_qnt,
            best_ask: raw.best_ask,
            best_ask_qnt: raw.best_ask_qnt,
            open: raw.open,
            high: raw.high,
            low: raw.low,
            volume: raw.volume,
            volume_quote: raw.volume_quote,
            open_time: raw.open_time,
            close_time: raw.close_time,
            first_trade_id: raw.first_trade_id,
            last_trade_id: raw.last_trade_id,
            total_trades: raw.total_trades,
        }
    }
}

impl From<RawTrade> for TradeEvent {
    fn from(raw: RawTrade) -> Self {
        Self {
            event_type: raw.event_type,
            event_time: raw.event_time,
            symbol: raw.symbol,
            price: raw.price,
            quantity: raw.quantity,
            maker: raw.maker,
            is_buyer_maker: raw.is_buyer_maker,
            trade_id: raw.trade_id,
        }
    }
}

// =============================================================================
// User Data
// =============================================================================

impl From<RawAccountPosition> for AccountEvent {
    fn from(raw: RawAccountPosition) -> Self {
        // Insertion order is wire order, so a repeated asset ends up with
        // its last entry.
        let balances = raw
            .balances
            .into_iter()
            .filter_map(|balance| {
                let asset = balance.asset?;
                Some((
                    asset,
                    AssetBalance {
                        available: balance.free,
                        locked: balance.locked,
                    },
                ))
            })
            .collect();

        Self {
            event_type: ACCOUNT_EVENT_TYPE.to_string(),
            event_time: raw.event_time,
            last_account_update: raw.last_account_update,
            balances,
        }
    }
}

impl From<RawExecutionReport> for ExecutionReportEvent {
    fn from(raw: RawExecutionReport) -> Self {
        Self {
            event_type: EXECUTION_REPORT_EVENT_TYPE.to_string(),
            event_time: raw.event_time,
            symbol: raw.symbol,
            new_client_order_id: raw.new_client_order_id,
            original_client_order_id: raw.original_client_order_id,
            side: raw.side,
            order_type: raw.order_type,
            time_in_force: raw.time_in_force,
            quantity: raw.quantity,
            price: raw.price,
            execution_type: raw.execution_type,
            stop_price: raw.stop_price,
            iceberg_quantity: raw.iceberg_quantity,
            order_status: raw.order_status,
            order_reject_reason: raw.order_reject_reason,
            order_id: raw.order_id,
            order_time: raw.order_time,
            last_trade_quantity: raw.last_trade_quantity,
            total_trade_quantity: raw.total_trade_quantity,
            price_last_trade: raw.price_last_trade,
            commission: raw.commission,
            commission_asset: raw.commission_asset,
            trade_id: raw.trade_id,
            is_order_working: raw.is_order_working,
            is_buyer_maker: raw.is_buyer_maker,
            creation_time: raw.creation_time,
            total_quote_trade_quantity: raw.total_quote_trade_quantity,
        }
    }
}

fn account_position(fields: Map<String, Value>) -> Result<UserEvent, serde_json::Error> {
    let raw: RawAccountPosition = serde_json::from_value(Value::Object(fields))?;
    Ok(UserEvent::Account(raw.into()))
}

fn execution_report(fields: Map<String, Value>) -> Result<UserEvent, serde_json::Error> {
    let raw: RawExecutionReport = serde_json::from_value(Value::Object(fields))?;
    Ok(UserEvent::ExecutionReport(Box::new(raw.into())))
}

/// Look up the transform registered for a user event type.
#[must_use]
pub fn user_transform(event_type: &str) -> Option<UserTransform> {
    USER_TRANSFORMS
        .iter()
        .find(|(name, _)| *name == event_type)
        .map(|(_, transform)| *transform)
}

/// Dispatch one decoded user event object to its transform.
///
/// Unknown (or missing) discriminators never fail: the fields come back
/// unchanged with `e` renamed to `type`. Only a registered transform whose
/// fields carry the wrong wire types can return an error.
pub fn transform_user_event(
    mut fields: Map<String, Value>,
) -> Result<UserEvent, serde_json::Error> {
    let event_type = fields.remove("e").unwrap_or(Value::Null);

    if let Some(transform) = event_type.as_str().and_then(user_transform) {
        return transform(fields);
    }

    fields.insert("type".to_string(), event_type);
    Ok(UserEvent::Other(fields))
}
