use crate::errors::AppError;
use crate::external::market_data::{Bar, MarketDataError, MarketDataProvider};
use crate::services::trading_calendar;
use bigdecimal::{BigDecimal, RoundingMode, ToPrimitive};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::debug;

/// How far back the calendar query reaches when resolving the comparison
/// pair. A week always contains at least three sessions, holidays included.
const CALENDAR_LOOKBACK_DAYS: i64 = 7;

/// Rounds to `scale` decimals with ties going away from zero, so 2.345
/// becomes 2.35 and -2.345 becomes -2.35.
///
/// Parsing the f64's shortest decimal form keeps 2.345 as "2.345" instead
/// of its binary expansion 2.34499999..., which would otherwise tip the
/// tie the wrong way.
pub fn round_half_up(value: f64, scale: i64) -> f64 {
    match BigDecimal::from_str(&value.to_string()) {
        Ok(d) => d
            .with_scale_round(scale, RoundingMode::HalfUp)
            .to_f64()
            .unwrap_or(value),
        // Non-finite input; callers guard, but don't panic on it.
        Err(_) => value,
    }
}

/// Percentage change from baseline to current, rounded to 2 decimals.
/// A zero or non-finite baseline has no meaningful change and yields None.
pub fn percent_change(baseline_close: f64, current_close: f64) -> Option<f64> {
    if baseline_close == 0.0 || !baseline_close.is_finite() || !current_close.is_finite() {
        return None;
    }
    Some(round_half_up(
        ((current_close - baseline_close) / baseline_close) * 100.0,
        2,
    ))
}

/// Per-ticker change between the last baseline bar's close and the last
/// current bar's close. Tickers missing or empty on either side are
/// excluded, never error cases; the output key set is always a subset of
/// the intersection of the input key sets.
pub fn price_change_percentages(
    baseline_bars: &HashMap<String, Vec<Bar>>,
    latest_bars: &HashMap<String, Vec<Bar>>,
) -> HashMap<String, f64> {
    baseline_bars
        .iter()
        .filter_map(|(symbol, bars)| {
            let baseline = bars.last()?;
            let current = latest_bars.get(symbol)?.last()?;
            percent_change(baseline.close, current.close).map(|pct| (symbol.clone(), pct))
        })
        .collect()
}

/// Latest bars plus day-over-day changes for one refresh cycle.
#[derive(Debug, Clone, Default)]
pub struct PriceChangeReport {
    pub latest_bars: HashMap<String, Vec<Bar>>,
    pub changes: HashMap<String, f64>,
}

fn data_err(e: MarketDataError) -> AppError {
    AppError::DataUnavailable(e.to_string())
}

/// Resolves the comparison sessions, fetches the baseline closing-minute
/// bars and the freshest permitted bars, and computes the change map.
pub async fn latest_price_change_percentages(
    provider: &dyn MarketDataProvider,
    symbols: &[String],
    now_utc: DateTime<Utc>,
) -> Result<PriceChangeReport, AppError> {
    if symbols.is_empty() {
        return Ok(PriceChangeReport::default());
    }

    let now_local = trading_calendar::exchange_now(now_utc);
    let today = now_local.date_naive();
    let range_start = today - Duration::days(CALENDAR_LOOKBACK_DAYS);

    let (baseline_day, latest_day) =
        trading_calendar::last_two_sessions(provider, range_start, today, now_local).await?;
    debug!(
        "comparing {} close against {} for {} symbols",
        baseline_day,
        latest_day,
        symbols.len()
    );

    let (base_start, base_end) = trading_calendar::closing_minute_window(baseline_day);
    let (latest_start, latest_end) = trading_calendar::latest_bar_window(latest_day, now_local);

    let baseline_bars = provider
        .minute_bars(symbols, base_start, base_end)
        .await
        .map_err(data_err)?;
    let latest_bars = provider
        .minute_bars(symbols, latest_start, latest_end)
        .await
        .map_err(data_err)?;

    let changes = price_change_percentages(&baseline_bars, &latest_bars);

    Ok(PriceChangeReport {
        latest_bars,
        changes,
    })
}
