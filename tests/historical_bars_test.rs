//! Chart-range fetch windows: intraday requests clamp to the feed-delay
//! horizon, everything else runs to the end of today.

mod common;

use chrono::{TimeZone, Utc};
use common::MockProvider;
use tickerdeck::errors::AppError;
use tickerdeck::services::historical_bars::{historical_bars, HistoryRange};

#[tokio::test]
async fn intraday_window_starts_at_first_session_and_clamps_the_end() {
    // Monday 2024-03-11 11:00 New York (EDT) is 15:00 UTC.
    let now = Utc.with_ymd_and_hms(2024, 3, 11, 15, 0, 0).unwrap();
    let provider = MockProvider::with_sessions(&[(2024, 3, 7), (2024, 3, 8), (2024, 3, 11)]);

    historical_bars(&provider, "AAPL", HistoryRange::OneDay, now)
        .await
        .unwrap();

    let windows = provider.windows();
    assert_eq!(windows.len(), 1);
    // First session in range is Thursday March 7; midnight EST is 05:00 UTC.
    assert_eq!(
        windows[0].0,
        Utc.with_ymd_and_hms(2024, 3, 7, 5, 0, 0).unwrap()
    );
    // End clamped 15 minutes behind "now".
    assert_eq!(
        windows[0].1,
        Utc.with_ymd_and_hms(2024, 3, 11, 14, 45, 0).unwrap()
    );
}

#[tokio::test]
async fn longer_ranges_run_to_the_end_of_today() {
    let now = Utc.with_ymd_and_hms(2024, 3, 11, 15, 0, 0).unwrap();
    let provider = MockProvider::with_sessions(&[(2024, 3, 7), (2024, 3, 8), (2024, 3, 11)]);

    historical_bars(&provider, "AAPL", HistoryRange::OneYear, now)
        .await
        .unwrap();

    let windows = provider.windows();
    // 23:59:59 EDT on March 11 is 03:59:59 UTC on March 12.
    assert_eq!(
        windows[0].1,
        Utc.with_ymd_and_hms(2024, 3, 12, 3, 59, 59).unwrap()
    );
}

#[tokio::test]
async fn empty_calendar_fails_soft() {
    let now = Utc.with_ymd_and_hms(2024, 3, 11, 15, 0, 0).unwrap();
    let provider = MockProvider::default(); // no sessions

    let err = historical_bars(&provider, "AAPL", HistoryRange::OneWeek, now)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::CalendarUnavailable(_)));
}
