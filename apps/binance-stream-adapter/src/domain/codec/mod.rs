//! Stream Codec Module
//!
//! Decodes text frames from Binance feeds into normalized events: JSON
//! into the raw wire shape, then through the matching field transform.
//!
//! - **Per-symbol feeds**: one JSON object per frame
//! - **All tickers feed**: one JSON array of ticker objects per frame
//! - **User data feed**: one JSON object, dispatched on its `e` field

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::domain::events::{PartialDepthEvent, TickerEvent, UserEvent};
use crate::domain::subscription::PartialDepthRequest;
use crate::domain::transform::transform_user_event;
use crate::domain::wire::{RawPartialDepth, RawTicker};

/// Codec errors.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// JSON decoding failed, or a field had the wrong type.
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    /// Valid JSON of an unexpected shape.
    #[error("invalid message format: {0}")]
    InvalidFormat(String),
}

/// JSON codec for Binance stream frames.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl JsonCodec {
    /// Create a new JSON codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Decode a frame into wire shape `W` and convert it to event `E`.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is not JSON or a field has the wrong type.
    pub fn decode<W, E>(&self, text: &str) -> Result<E, CodecError>
    where
        W: DeserializeOwned + Into<E>,
    {
        let raw: W = serde_json::from_str(text)?;
        Ok(raw.into())
    }

    /// Decode a partial depth snapshot, tagging it with its request.
    pub fn decode_partial_depth(
        &self,
        request: &PartialDepthRequest,
        text: &str,
    ) -> Result<PartialDepthEvent, CodecError> {
        let raw: RawPartialDepth = serde_json::from_str(text)?;
        Ok(PartialDepthEvent::from_snapshot(request, raw))
    }

    /// Decode an all-tickers frame.
    pub fn decode_all_tickers(&self, text: &str) -> Result<Vec<TickerEvent>, CodecError> {
        let raw: Vec<RawTicker> = serde_json::from_str(text)?;
        Ok(raw.into_iter().map(TickerEvent::from).collect())
    }

    /// Decode a user data frame.
    pub fn decode_user_event(&self, text: &str) -> Result<UserEvent, CodecError> {
        match serde_json::from_str::<Value>(text)? {
            Value::Object(fields) => Ok(transform_user_event(fields)?),
            other => Err(CodecError::InvalidFormat(format!(
                "expected JSON object, got: {}",
                truncate(&other.to_string(), 50)
            ))),
        }
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::{DepthEvent, TradeEvent};
    use crate::domain::wire::{RawDepthUpdate, RawTrade};

    #[test]
    fn decode_depth_frame() {
        let codec = JsonCodec::new();
        let event: DepthEvent = codec
            .decode::<RawDepthUpdate, _>(
                r#"{"e":"depthUpdate","E":1,"s":"BNBBTC","U":1,"u":2,"b":[["1","2"]],"a":[]}"#,
            )
            .unwrap();
        assert_eq!(event.bid_depth.len(), 1);
        assert!(event.ask_depth.is_empty());
    }

    #[test]
    fn decode_rejects_garbage() {
        let codec = JsonCodec::new();
        let result = codec.decode::<RawTrade, TradeEvent>("not json");
        assert!(matches!(result, Err(CodecError::Json(_))));
    }

    #[test]
    fn decode_rejects_wrong_field_type() {
        let codec = JsonCodec::new();
        let result = codec.decode::<RawTrade, TradeEvent>(r#"{"a":"not a number"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn decode_all_tickers_array() {
        let codec = JsonCodec::new();
        let events = codec
            .decode_all_tickers(r#"[{"e":"24hrTicker","s":"BNBBTC","c":"0.0025"},{"s":"ETHBTC"}]"#)
            .unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].cur_day_close.as_deref(), Some("0.0025"));
        assert_eq!(events[1].symbol.as_deref(), Some("ETHBTC"));
    }

    #[test]
    fn decode_user_event_requires_object() {
        let codec = JsonCodec::new();
        let result = codec.decode_user_event("[1,2,3]");
        assert!(matches!(result, Err(CodecError::InvalidFormat(_))));
    }

    #[test]
    fn decode_partial_depth_frame() {
        let codec = JsonCodec::new();
        let request = PartialDepthRequest::new("ETHBTC", 10);
        let event = codec
            .decode_partial_depth(&request, r#"{"lastUpdateId":7,"bids":[],"asks":[["2","3"]]}"#)
            .unwrap();
        assert_eq!(event.level, 10);
        assert_eq!(event.asks[0].quantity, "3");
    }
}
