//! Subscription Request Types
//!
//! Domain types describing what a caller asked to subscribe to, and the
//! address scheme that turns one request into one connection target per
//! symbol.
//!
//! # Address Scheme
//!
//! - Per-symbol feeds: `<base>/<lowercased-symbol>@<suffix>`
//! - All-symbols ticker feed: `<base>/!ticker@arr`
//! - User data feed: `<base>/<listenKey>`
//!
//! Requests are immutable once issued; the multiplexer only ever reads them.

use std::fmt;

// =============================================================================
// Constants
// =============================================================================

/// Production streaming endpoint used when no base address is configured.
pub const DEFAULT_BASE_URL: &str = "wss://stream.binance.com:9443/ws";

/// Suffix of the all-symbols ticker feed.
pub const ALL_TICKERS_STREAM: &str = "!ticker@arr";

// =============================================================================
// Types
// =============================================================================

/// An exchange symbol identifier (e.g. `BTCUSDT`), in any case.
pub type Symbol = String;

/// One or more symbols for a multi-symbol subscription.
///
/// Built from a single symbol or from an ordered sequence; the order only
/// decides the order in which connections are opened.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolList(Vec<Symbol>);

impl SymbolList {
    /// Create a symbol list from any sequence of symbols.
    #[must_use]
    pub fn new<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Symbol>,
    {
        Self(symbols.into_iter().map(Into::into).collect())
    }

    /// The symbols as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[Symbol] {
        &self.0
    }

    /// Number of symbols.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the list holds no symbols.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the symbols.
    pub fn iter(&self) -> std::slice::Iter<'_, Symbol> {
        self.0.iter()
    }
}

impl From<&str> for SymbolList {
    fn from(symbol: &str) -> Self {
        Self(vec![symbol.to_string()])
    }
}

impl From<String> for SymbolList {
    fn from(symbol: String) -> Self {
        Self(vec![symbol])
    }
}

impl From<&String> for SymbolList {
    fn from(symbol: &String) -> Self {
        Self(vec![symbol.clone()])
    }
}

impl From<Vec<String>> for SymbolList {
    fn from(symbols: Vec<String>) -> Self {
        Self(symbols)
    }
}

impl From<Vec<&str>> for SymbolList {
    fn from(symbols: Vec<&str>) -> Self {
        Self::new(symbols)
    }
}

impl From<&[&str]> for SymbolList {
    fn from(symbols: &[&str]) -> Self {
        Self::new(symbols.iter().copied())
    }
}

impl From<&[String]> for SymbolList {
    fn from(symbols: &[String]) -> Self {
        Self(symbols.to_vec())
    }
}

impl<const N: usize> From<[&str; N]> for SymbolList {
    fn from(symbols: [&str; N]) -> Self {
        Self::new(symbols)
    }
}

impl IntoIterator for SymbolList {
    type Item = Symbol;
    type IntoIter = std::vec::IntoIter<Symbol>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a SymbolList {
    type Item = &'a Symbol;
    type IntoIter = std::slice::Iter<'a, Symbol>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A partial book depth request: one symbol at one detail level.
///
/// The symbol and level are echoed back into every event, since the
/// partial depth payload itself carries neither.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialDepthRequest {
    /// Symbol as given by the caller (case preserved).
    pub symbol: Symbol,
    /// Number of levels per side (5, 10 or 20 on the exchange).
    pub level: u32,
}

impl PartialDepthRequest {
    /// Create a new partial depth request.
    #[must_use]
    pub fn new(symbol: impl Into<Symbol>, level: u32) -> Self {
        Self {
            symbol: symbol.into(),
            level,
        }
    }
}

/// One or more partial depth requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialDepthRequests(Vec<PartialDepthRequest>);

impl PartialDepthRequests {
    /// Number of requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no requests.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<PartialDepthRequest> for PartialDepthRequests {
    fn from(request: PartialDepthRequest) -> Self {
        Self(vec![request])
    }
}

impl From<Vec<PartialDepthRequest>> for PartialDepthRequests {
    fn from(requests: Vec<PartialDepthRequest>) -> Self {
        Self(requests)
    }
}

impl From<(&str, u32)> for PartialDepthRequests {
    fn from((symbol, level): (&str, u32)) -> Self {
        Self(vec![PartialDepthRequest::new(symbol, level)])
    }
}

impl From<Vec<(&str, u32)>> for PartialDepthRequests {
    fn from(requests: Vec<(&str, u32)>) -> Self {
        Self(
            requests
                .into_iter()
                .map(|(symbol, level)| PartialDepthRequest::new(symbol, level))
                .collect(),
        )
    }
}

impl IntoIterator for PartialDepthRequests {
    type Item = PartialDepthRequest;
    type IntoIter = std::vec::IntoIter<PartialDepthRequest>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

// =============================================================================
// Stream Kinds
// =============================================================================

/// Per-symbol feed type, deciding the address suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StreamKind {
    /// Diff depth updates (`@depth`).
    Depth,
    /// Top-of-book snapshots at a fixed level (`@depth<level>`).
    PartialDepth {
        /// Levels per side.
        level: u32,
    },
    /// Candlesticks at an interval (`@kline_<interval>`).
    Kline {
        /// Interval code such as `1m` or `4h`.
        interval: String,
    },
    /// 24h rolling ticker (`@ticker`).
    Ticker,
    /// Raw trades (`@trade`).
    Trade,
    /// Aggregate trades (`@aggTrade`).
    AggTrade,
}

impl StreamKind {
    /// Address suffix placed after the `@`.
    #[must_use]
    pub fn suffix(&self) -> String {
        match self {
            Self::Depth => "depth".to_string(),
            Self::PartialDepth { level } => format!("depth{level}"),
            Self::Kline { interval } => format!("kline_{interval}"),
            Self::Ticker => "ticker".to_string(),
            Self::Trade => "trade".to_string(),
            Self::AggTrade => "aggTrade".to_string(),
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.suffix())
    }
}

// =============================================================================
// Address Builders
// =============================================================================

/// Connection address for one symbol of a per-symbol feed.
#[must_use]
pub fn stream_address(base: &str, symbol: &str, kind: &StreamKind) -> String {
    format!("{base}/{}@{kind}", symbol.to_lowercase())
}

/// Connection address of the all-symbols ticker feed.
#[must_use]
pub fn all_tickers_address(base: &str) -> String {
    format!("{base}/{ALL_TICKERS_STREAM}")
}

/// Connection address of the user data feed for a session token.
#[must_use]
pub fn user_stream_address(base: &str, listen_key: &str) -> String {
    format!("{base}/{listen_key}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    const BASE: &str = "wss://example.test/ws";

    #[test_case(StreamKind::Depth, "depth" ; "depth")]
    #[test_case(StreamKind::PartialDepth { level: 10 }, "depth10" ; "partial depth")]
    #[test_case(StreamKind::Kline { interval: "5m".to_string() }, "kline_5m" ; "kline")]
    #[test_case(StreamKind::Ticker, "ticker" ; "ticker")]
    #[test_case(StreamKind::Trade, "trade" ; "trade")]
    #[test_case(StreamKind::AggTrade, "aggTrade" ; "agg trade")]
    fn suffixes(kind: StreamKind, expected: &str) {
        assert_eq!(kind.suffix(), expected);
    }

    #[test]
    fn stream_address_lowercases_symbol() {
        assert_eq!(
            stream_address(BASE, "ETHBTC", &StreamKind::Depth),
            "wss://example.test/ws/ethbtc@depth"
        );
    }

    #[test]
    fn global_addresses() {
        assert_eq!(all_tickers_address(BASE), "wss://example.test/ws/!ticker@arr");
        assert_eq!(user_stream_address(BASE, "abc123"), "wss://example.test/ws/abc123");
    }

    #[test]
    fn symbol_list_conversions() {
        assert_eq!(SymbolList::from("BTCUSDT").as_slice(), ["BTCUSDT"]);
        assert_eq!(SymbolList::from(vec!["A", "B"]).len(), 2);
        assert_eq!(SymbolList::from(["A", "B", "C"]).len(), 3);
        assert!(SymbolList::default().is_empty());
    }

    #[test]
    fn partial_depth_request_conversions() {
        let requests = PartialDepthRequests::from(vec![("BNBBTC", 5), ("ETHBTC", 20)]);
        let collected: Vec<_> = requests.into_iter().collect();
        assert_eq!(collected[0], PartialDepthRequest::new("BNBBTC", 5));
        assert_eq!(collected[1].level, 20);
    }

    proptest! {
        #[test]
        fn address_is_case_folded(symbol in "[A-Za-z0-9]{1,12}") {
            let upper = stream_address(BASE, &symbol.to_uppercase(), &StreamKind::Ticker);
            let lower = stream_address(BASE, &symbol.to_lowercase(), &StreamKind::Ticker);
            prop_assert_eq!(&upper, &lower);
            prop_assert_eq!(upper, format!("{BASE}/{}@ticker", symbol.to_lowercase()));
        }
    }
}
