use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use thiserror::Error;

/// One OHLC aggregate for a fixed time bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quote {
    pub timestamp: DateTime<Utc>,
    pub bid_price: f64,
    pub bid_size: f64,
    pub ask_price: f64,
    pub ask_size: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trade {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub size: f64,
}

/// A calendar date confirmed open for trading at the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TradingSession {
    pub date: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct AssetInfo {
    pub symbol: String,
    pub name: String,
    pub exchange: String,
}

#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("network error: {0}")]
    Network(String),

    #[error("bad response: {0}")]
    BadResponse(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("rate limited")]
    RateLimited,

    #[error("unauthorized")]
    Unauthorized,
}

/// Boundary to the brokerage market-data and trading-calendar API.
///
/// Implementations must return calendar sessions in chronologically
/// ascending order; the resolver relies on that.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// 1-minute bars for several symbols over a UTC window, ascending.
    async fn minute_bars(
        &self,
        symbols: &[String],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<HashMap<String, Vec<Bar>>, MarketDataError>;

    /// Bars for a single symbol over a UTC window, aggregated by the given
    /// timeframe ("5Min", "1H", "1D", "7D", ...), ascending.
    async fn bars_single(
        &self,
        symbol: &str,
        timeframe: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Bar>, MarketDataError>;

    async fn latest_quotes(
        &self,
        symbols: &[String],
    ) -> Result<HashMap<String, Quote>, MarketDataError>;

    async fn latest_trades(
        &self,
        symbols: &[String],
    ) -> Result<HashMap<String, Trade>, MarketDataError>;

    /// Confirmed trading sessions within [start, end], ascending.
    async fn trading_sessions(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<TradingSession>, MarketDataError>;

    /// Official name and listed exchange for a symbol.
    async fn asset_info(&self, symbol: &str) -> Result<AssetInfo, MarketDataError>;

    /// Probes the account endpoint with the given credential pair. Returns
    /// Ok(false) when the pair is rejected, Err only on transport trouble.
    async fn check_credentials(
        &self,
        api_key: &str,
        api_secret: &str,
    ) -> Result<bool, MarketDataError>;
}
