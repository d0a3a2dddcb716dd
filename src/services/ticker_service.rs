use sqlx::SqlitePool;
use tracing::info;

use crate::db::ticker_queries;
use crate::errors::AppError;
use crate::external::market_data::{MarketDataError, MarketDataProvider};
use crate::models::ticker::{validate_symbol, TrackedTicker};

fn data_err(e: MarketDataError) -> AppError {
    AppError::DataUnavailable(e.to_string())
}

/// Track a new ticker. Name and exchange come from the provider's asset
/// lookup so the board never shows a symbol the provider doesn't know.
pub async fn add_ticker(
    pool: &SqlitePool,
    provider: &dyn MarketDataProvider,
    symbol: &str,
    favorite: bool,
) -> Result<TrackedTicker, AppError> {
    validate_symbol(symbol)?;
    let info = provider
        .asset_info(symbol.trim())
        .await
        .map_err(data_err)?;

    let ticker = TrackedTicker {
        symbol: info.symbol,
        name: info.name,
        exchange: info.exchange,
        is_favorite: favorite,
    };
    let saved = ticker_queries::upsert(pool, &ticker).await?;
    info!("tracking ticker {}", saved.symbol);
    Ok(saved)
}

pub async fn get_ticker(pool: &SqlitePool, symbol: &str) -> Result<TrackedTicker, AppError> {
    ticker_queries::get(pool, symbol)
        .await?
        .ok_or(AppError::NotFound)
}

pub async fn all_tickers_sorted(pool: &SqlitePool) -> Result<Vec<TrackedTicker>, AppError> {
    Ok(ticker_queries::all_sorted_by_symbol(pool).await?)
}

pub async fn favorite_tickers(pool: &SqlitePool) -> Result<Vec<TrackedTicker>, AppError> {
    Ok(ticker_queries::by_favorite(pool, true).await?)
}

pub async fn non_favorite_tickers(pool: &SqlitePool) -> Result<Vec<TrackedTicker>, AppError> {
    Ok(ticker_queries::by_favorite(pool, false).await?)
}

pub async fn tickers_by_exchange(
    pool: &SqlitePool,
    exchange: &str,
) -> Result<Vec<TrackedTicker>, AppError> {
    Ok(ticker_queries::by_exchange(pool, exchange).await?)
}

pub async fn tickers_by_name_prefix(
    pool: &SqlitePool,
    prefix: &str,
) -> Result<Vec<TrackedTicker>, AppError> {
    Ok(ticker_queries::by_name_prefix(pool, prefix).await?)
}

pub async fn set_favorite(
    pool: &SqlitePool,
    symbol: &str,
    favorite: bool,
) -> Result<TrackedTicker, AppError> {
    ticker_queries::set_favorite(pool, symbol, favorite)
        .await?
        .ok_or(AppError::NotFound)
}

pub async fn remove_ticker(pool: &SqlitePool, symbol: &str) -> Result<(), AppError> {
    let removed = ticker_queries::delete(pool, symbol).await?;
    if removed == 0 {
        return Err(AppError::NotFound);
    }
    info!("stopped tracking ticker {}", symbol);
    Ok(())
}
