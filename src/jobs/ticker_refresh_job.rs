use crate::errors::AppError;
use crate::jobs::{JobContext, RefreshSnapshot};
use crate::services::{price_change, ticker_service};
use chrono::Utc;
use tracing::{debug, info, warn};

/// One refresh tick: load the tracked tickers, run the price-change
/// pipeline, publish a fresh snapshot. Soft failures keep the previous
/// snapshot and let the next tick retry.
pub async fn run(ctx: &JobContext) -> Result<(), AppError> {
    let Ok(_guard) = ctx.in_flight.try_lock() else {
        warn!("previous refresh still in flight, skipping tick");
        return Ok(());
    };

    let tickers = ticker_service::all_tickers_sorted(&ctx.pool).await?;
    if tickers.is_empty() {
        debug!("no tracked tickers, nothing to refresh");
        return Ok(());
    }
    let symbols: Vec<String> = tickers.into_iter().map(|t| t.symbol).collect();

    let now = Utc::now();
    match price_change::latest_price_change_percentages(ctx.market_data.as_ref(), &symbols, now)
        .await
    {
        Ok(report) => {
            let latest_close = report
                .latest_bars
                .iter()
                .filter_map(|(sym, bars)| bars.last().map(|b| (sym.clone(), b.close)))
                .collect();
            let snapshot = RefreshSnapshot {
                refreshed_at: Some(now),
                changes: report.changes,
                latest_close,
            };
            info!(
                "refreshed {} of {} tickers",
                snapshot.changes.len(),
                symbols.len()
            );
            ctx.snapshot_tx.send_replace(snapshot);
            Ok(())
        }
        Err(e) if e.is_soft() => {
            warn!("refresh skipped this cycle: {}", e);
            Ok(())
        }
        Err(e) => Err(e),
    }
}
