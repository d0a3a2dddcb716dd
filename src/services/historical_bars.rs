use crate::errors::AppError;
use crate::external::market_data::{Bar, MarketDataError, MarketDataProvider};
use crate::services::trading_calendar::{
    self, exchange_local_to_utc, exchange_now, FEED_DELAY_MINUTES,
};
use chrono::{DateTime, Duration, Months, NaiveDate, NaiveTime, Utc};

/// Chart ranges the UI offers. The range itself declares whether it wants
/// same-day data; callers never have to signal intraday intent separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryRange {
    OneDay,
    OneWeek,
    OneMonth,
    ThreeMonths,
    OneYear,
    FiveYears,
}

impl HistoryRange {
    /// Bar aggregation bucket requested from the provider.
    pub fn timeframe(&self) -> &'static str {
        match self {
            HistoryRange::OneDay => "5Min",
            HistoryRange::OneWeek => "1H",
            HistoryRange::OneMonth => "1H",
            HistoryRange::ThreeMonths => "1D",
            HistoryRange::OneYear => "1D",
            HistoryRange::FiveYears => "7D",
        }
    }

    /// First calendar day of the lookback window ending today.
    pub fn lookback_start(&self, today: NaiveDate) -> NaiveDate {
        let months = |n: u32| {
            today
                .checked_sub_months(Months::new(n))
                .unwrap_or(NaiveDate::MIN)
        };
        match self {
            // A week back guarantees at least one open session in range.
            HistoryRange::OneDay => today - Duration::days(7),
            HistoryRange::OneWeek => today - Duration::days(7),
            HistoryRange::OneMonth => months(1),
            HistoryRange::ThreeMonths => months(3),
            HistoryRange::OneYear => months(12),
            HistoryRange::FiveYears => months(60),
        }
    }

    /// Only the one-day chart reads bars from the still-open session.
    pub fn is_intraday(&self) -> bool {
        matches!(self, HistoryRange::OneDay)
    }
}

fn data_err(e: MarketDataError) -> AppError {
    AppError::DataUnavailable(e.to_string())
}

/// Bars for one symbol over the given range. The window starts at the
/// first confirmed session inside the lookback and normally ends at the
/// end of today, exchange-local. Intraday ranges clamp the end to the
/// feed-delay horizon so the provider never rejects the request for
/// reaching into data we are not entitled to yet.
pub async fn historical_bars(
    provider: &dyn MarketDataProvider,
    symbol: &str,
    range: HistoryRange,
    now_utc: DateTime<Utc>,
) -> Result<Vec<Bar>, AppError> {
    let now_local = exchange_now(now_utc);
    let today = now_local.date_naive();

    let start_day =
        trading_calendar::first_session_in_range(provider, range.lookback_start(today), today)
            .await?;

    let start = exchange_local_to_utc(start_day, NaiveTime::MIN);
    let day_end = exchange_local_to_utc(
        today,
        NaiveTime::from_hms_opt(23, 59, 59).expect("valid time"),
    );
    let end = if range.is_intraday() {
        day_end.min(now_utc - Duration::minutes(FEED_DELAY_MINUTES))
    } else {
        day_end
    };

    provider
        .bars_single(symbol, range.timeframe(), start, end)
        .await
        .map_err(data_err)
}
