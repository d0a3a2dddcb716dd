//! End-to-end refresh pipeline against a canned provider: session
//! resolution, bar-window selection, change calculation, and the
//! refresh job's snapshot publishing.

mod common;

use chrono::{TimeZone, Utc};
use common::{closes, MockProvider};
use std::collections::HashMap;
use std::sync::Arc;
use tickerdeck::errors::AppError;
use tickerdeck::jobs::{ticker_refresh_job, JobContext, RefreshSnapshot};
use tickerdeck::models::ticker::TrackedTicker;
use tickerdeck::services::price_change::latest_price_change_percentages;
use tokio::sync::{watch, Mutex};

fn symbols(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn pre_market_monday_compares_thursday_to_friday() {
    // Monday 2024-03-11 09:00 New York is 13:00 UTC (EDT).
    let now = Utc.with_ymd_and_hms(2024, 3, 11, 13, 0, 0).unwrap();
    let provider =
        MockProvider::with_sessions(&[(2024, 3, 5), (2024, 3, 6), (2024, 3, 7), (2024, 3, 8), (2024, 3, 11)]);
    provider.push_bars(closes(&[("AAPL", 100.0)])); // Thursday close
    provider.push_bars(closes(&[("AAPL", 105.0)])); // Friday close

    let report = latest_price_change_percentages(&provider, &symbols(&["AAPL"]), now)
        .await
        .unwrap();

    assert_eq!(report.changes.get("AAPL"), Some(&5.0));

    // Both windows are closing minutes; March 7/8 are still EST (UTC-5),
    // so 15:59 local is 20:59 UTC.
    let windows = provider.windows();
    assert_eq!(
        windows[0],
        (
            Utc.with_ymd_and_hms(2024, 3, 7, 20, 59, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 7, 21, 0, 0).unwrap()
        )
    );
    assert_eq!(
        windows[1],
        (
            Utc.with_ymd_and_hms(2024, 3, 8, 20, 59, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 8, 21, 0, 0).unwrap()
        )
    );
}

#[tokio::test]
async fn mid_session_compares_friday_close_to_delayed_intraday_bar() {
    // Monday 2024-03-11 11:00 New York (EDT) is 15:00 UTC.
    let now = Utc.with_ymd_and_hms(2024, 3, 11, 15, 0, 0).unwrap();
    let provider = MockProvider::with_sessions(&[(2024, 3, 7), (2024, 3, 8), (2024, 3, 11)]);
    provider.push_bars(closes(&[("AAPL", 50.0)]));
    provider.push_bars(closes(&[("AAPL", 45.0)]));

    let report = latest_price_change_percentages(&provider, &symbols(&["AAPL"]), now)
        .await
        .unwrap();

    assert_eq!(report.changes.get("AAPL"), Some(&-10.0));

    let windows = provider.windows();
    // Baseline is Friday's closing minute.
    assert_eq!(
        windows[0],
        (
            Utc.with_ymd_and_hms(2024, 3, 8, 20, 59, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 8, 21, 0, 0).unwrap()
        )
    );
    // Latest window ends 15 minutes before "now", feed-delay compensation.
    assert_eq!(
        windows[1],
        (
            Utc.with_ymd_and_hms(2024, 3, 11, 14, 44, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 11, 14, 45, 0).unwrap()
        )
    );
}

#[tokio::test]
async fn unreachable_calendar_is_a_soft_failure() {
    let now = Utc.with_ymd_and_hms(2024, 3, 11, 15, 0, 0).unwrap();
    let provider = MockProvider {
        calendar_down: true,
        ..MockProvider::default()
    };

    let err = latest_price_change_percentages(&provider, &symbols(&["AAPL"]), now)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::CalendarUnavailable(_)));
    assert!(err.is_soft());
}

#[tokio::test]
async fn no_symbols_means_no_provider_traffic() {
    let now = Utc.with_ymd_and_hms(2024, 3, 11, 15, 0, 0).unwrap();
    let provider = MockProvider::with_sessions(&[(2024, 3, 7), (2024, 3, 8)]);

    let report = latest_price_change_percentages(&provider, &[], now)
        .await
        .unwrap();
    assert!(report.changes.is_empty());
    assert!(provider.windows().is_empty());
}

#[tokio::test]
async fn partial_data_yields_partial_results() {
    let now = Utc.with_ymd_and_hms(2024, 3, 11, 15, 0, 0).unwrap();
    let provider = MockProvider::with_sessions(&[(2024, 3, 7), (2024, 3, 8), (2024, 3, 11)]);
    // MSFT has no latest bar, ZERO has a zero baseline close.
    provider.push_bars(closes(&[("AAPL", 100.0), ("MSFT", 200.0), ("ZERO", 0.0)]));
    provider.push_bars(closes(&[("AAPL", 105.0), ("ZERO", 10.0)]));

    let report = latest_price_change_percentages(
        &provider,
        &symbols(&["AAPL", "MSFT", "ZERO"]),
        now,
    )
    .await
    .unwrap();

    assert_eq!(report.changes.len(), 1);
    assert_eq!(report.changes.get("AAPL"), Some(&5.0));
}

async fn job_context(provider: MockProvider) -> (JobContext, watch::Receiver<RefreshSnapshot>) {
    let pool = common::test_pool().await;
    let (tx, rx) = watch::channel(RefreshSnapshot::default());
    (
        JobContext {
            pool,
            market_data: Arc::new(provider),
            snapshot_tx: tx,
            in_flight: Arc::new(Mutex::new(())),
        },
        rx,
    )
}

async fn track(ctx: &JobContext, symbol: &str) {
    tickerdeck::db::ticker_queries::upsert(
        &ctx.pool,
        &TrackedTicker {
            symbol: symbol.to_string(),
            name: format!("{} Inc.", symbol),
            exchange: "NASDAQ".to_string(),
            is_favorite: false,
        },
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn refresh_job_publishes_a_snapshot() {
    // Sessions are all in the past, so the last two are used no matter
    // when the test runs.
    let provider = MockProvider::with_sessions(&[(2024, 3, 7), (2024, 3, 8)]);
    provider.push_bars(closes(&[("AAPL", 100.0)]));
    provider.push_bars(closes(&[("AAPL", 105.0)]));
    let (ctx, rx) = job_context(provider).await;
    track(&ctx, "AAPL").await;

    ticker_refresh_job::run(&ctx).await.unwrap();

    let snapshot = rx.borrow().clone();
    assert!(snapshot.refreshed_at.is_some());
    assert_eq!(snapshot.changes.get("AAPL"), Some(&5.0));
    assert_eq!(snapshot.latest_close.get("AAPL"), Some(&105.0));
}

#[tokio::test]
async fn refresh_job_keeps_previous_snapshot_on_soft_failure() {
    let provider = MockProvider {
        calendar_down: true,
        ..MockProvider::default()
    };
    let (ctx, rx) = job_context(provider).await;
    track(&ctx, "AAPL").await;

    // Soft failure: run succeeds but publishes nothing.
    ticker_refresh_job::run(&ctx).await.unwrap();
    assert!(rx.borrow().refreshed_at.is_none());
}

#[tokio::test]
async fn refresh_job_skips_tick_while_one_is_in_flight() {
    let provider = Arc::new(MockProvider::with_sessions(&[(2024, 3, 7), (2024, 3, 8)]));
    provider.push_bars(closes(&[("AAPL", 100.0)]));
    provider.push_bars(closes(&[("AAPL", 105.0)]));

    let pool = common::test_pool().await;
    let (tx, rx) = watch::channel(RefreshSnapshot::default());
    let in_flight = Arc::new(Mutex::new(()));
    let ctx = JobContext {
        pool,
        market_data: provider.clone(),
        snapshot_tx: tx,
        in_flight: in_flight.clone(),
    };
    track(&ctx, "AAPL").await;

    // While a cycle holds the lock, a tick is a skip: no snapshot, no
    // provider traffic, and no error.
    let guard = in_flight.lock().await;
    ticker_refresh_job::run(&ctx).await.unwrap();
    assert!(rx.borrow().refreshed_at.is_none());
    assert!(provider.windows().is_empty());
    drop(guard);

    // The next tick goes through once the previous cycle has finished.
    ticker_refresh_job::run(&ctx).await.unwrap();
    assert_eq!(rx.borrow().changes.get("AAPL"), Some(&5.0));
}

#[tokio::test]
async fn refresh_job_with_no_tickers_is_a_quiet_noop() {
    let provider = MockProvider::with_sessions(&[(2024, 3, 7), (2024, 3, 8)]);
    let (ctx, rx) = job_context(provider).await;

    ticker_refresh_job::run(&ctx).await.unwrap();
    assert!(rx.borrow().refreshed_at.is_none());
}
