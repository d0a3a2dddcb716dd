#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use tickerdeck::external::market_data::{
    AssetInfo, Bar, MarketDataError, MarketDataProvider, Quote, Trade, TradingSession,
};

/// In-memory store with the real schema. One connection, or each pool
/// checkout would get its own empty database.
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations");
    pool
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn bar_at(ts: DateTime<Utc>, close: f64) -> Bar {
    Bar {
        timestamp: ts,
        open: close,
        high: close,
        low: close,
        close,
        volume: 1000.0,
    }
}

pub fn closes(entries: &[(&str, f64)]) -> HashMap<String, Vec<Bar>> {
    entries
        .iter()
        .map(|&(sym, close)| (sym.to_string(), vec![bar_at(Utc::now(), close)]))
        .collect()
}

/// Canned market-data collaborator. Bar responses are served in FIFO order,
/// one per `minute_bars` call, and every requested window is recorded so
/// tests can assert on it.
pub struct MockProvider {
    pub sessions: Vec<TradingSession>,
    pub calendar_down: bool,
    pub accept_credentials: bool,
    pub asset: Option<AssetInfo>,
    pub bar_responses: Mutex<VecDeque<HashMap<String, Vec<Bar>>>>,
    pub recorded_windows: Mutex<Vec<(DateTime<Utc>, DateTime<Utc>)>>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self {
            sessions: Vec::new(),
            calendar_down: false,
            accept_credentials: true,
            asset: None,
            bar_responses: Mutex::new(VecDeque::new()),
            recorded_windows: Mutex::new(Vec::new()),
        }
    }
}

impl MockProvider {
    pub fn with_sessions(dates: &[(i32, u32, u32)]) -> Self {
        Self {
            sessions: dates
                .iter()
                .map(|&(y, m, d)| TradingSession { date: date(y, m, d) })
                .collect(),
            ..Self::default()
        }
    }

    pub fn push_bars(&self, bars: HashMap<String, Vec<Bar>>) {
        self.bar_responses.lock().unwrap().push_back(bars);
    }

    pub fn windows(&self) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
        self.recorded_windows.lock().unwrap().clone()
    }
}

#[async_trait]
impl MarketDataProvider for MockProvider {
    async fn minute_bars(
        &self,
        _symbols: &[String],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<HashMap<String, Vec<Bar>>, MarketDataError> {
        self.recorded_windows.lock().unwrap().push((start, end));
        Ok(self
            .bar_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default())
    }

    async fn bars_single(
        &self,
        _symbol: &str,
        _timeframe: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Bar>, MarketDataError> {
        self.recorded_windows.lock().unwrap().push((start, end));
        Ok(self
            .bar_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default()
            .into_values()
            .next()
            .unwrap_or_default())
    }

    async fn latest_quotes(
        &self,
        _symbols: &[String],
    ) -> Result<HashMap<String, Quote>, MarketDataError> {
        Ok(HashMap::new())
    }

    async fn latest_trades(
        &self,
        _symbols: &[String],
    ) -> Result<HashMap<String, Trade>, MarketDataError> {
        Ok(HashMap::new())
    }

    async fn trading_sessions(
        &self,
        _start: NaiveDate,
        _end: NaiveDate,
    ) -> Result<Vec<TradingSession>, MarketDataError> {
        if self.calendar_down {
            return Err(MarketDataError::Network("calendar unreachable".to_string()));
        }
        Ok(self.sessions.clone())
    }

    async fn asset_info(&self, symbol: &str) -> Result<AssetInfo, MarketDataError> {
        self.asset
            .clone()
            .ok_or_else(|| MarketDataError::BadResponse(format!("unknown asset {}", symbol)))
    }

    async fn check_credentials(
        &self,
        _api_key: &str,
        _api_secret: &str,
    ) -> Result<bool, MarketDataError> {
        Ok(self.accept_credentials)
    }
}
