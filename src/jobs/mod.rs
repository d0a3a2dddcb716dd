//! Background jobs driven by the refresh scheduler.
//!
//! Jobs are idempotent per tick: each invocation reads the tracked tickers
//! and external data fresh, and a failed cycle leaves the previous snapshot
//! in place for the UI to keep showing.

pub mod ticker_refresh_job;

use crate::external::market_data::MarketDataProvider;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

/// Context handed to job functions.
#[derive(Clone)]
pub struct JobContext {
    pub pool: SqlitePool,
    pub market_data: Arc<dyn MarketDataProvider>,
    pub snapshot_tx: watch::Sender<RefreshSnapshot>,
    /// Held for the duration of one refresh; a tick that finds it taken is
    /// skipped so at most one request cycle is ever in flight.
    pub in_flight: Arc<Mutex<()>>,
}

/// What the display layer consumes: the last successful refresh result.
#[derive(Debug, Clone, Default)]
pub struct RefreshSnapshot {
    pub refreshed_at: Option<DateTime<Utc>>,
    /// Ticker -> day-over-day change, percent, 2 decimals.
    pub changes: HashMap<String, f64>,
    /// Ticker -> close of the freshest permitted bar.
    pub latest_close: HashMap<String, f64>,
}
