use sqlx::SqlitePool;

use crate::models::ticker::TrackedTicker;

const TICKER_COLUMNS: &str = "symbol, name, exchange, is_favorite";

pub async fn upsert(
    pool: &SqlitePool,
    ticker: &TrackedTicker,
) -> Result<TrackedTicker, sqlx::Error> {
    sqlx::query_as::<_, TrackedTicker>(&format!(
        r#"
        INSERT INTO user_tickers (symbol, name, exchange, is_favorite)
        VALUES (?, ?, ?, ?)
        ON CONFLICT (symbol) DO UPDATE
        SET name = excluded.name,
            exchange = excluded.exchange,
            is_favorite = excluded.is_favorite
        RETURNING {}
        "#,
        TICKER_COLUMNS
    ))
    .bind(&ticker.symbol)
    .bind(&ticker.name)
    .bind(&ticker.exchange)
    .bind(ticker.is_favorite)
    .fetch_one(pool)
    .await
}

pub async fn get(pool: &SqlitePool, symbol: &str) -> Result<Option<TrackedTicker>, sqlx::Error> {
    sqlx::query_as::<_, TrackedTicker>(&format!(
        "SELECT {} FROM user_tickers WHERE symbol = ?",
        TICKER_COLUMNS
    ))
    .bind(symbol)
    .fetch_optional(pool)
    .await
}

pub async fn all_sorted_by_symbol(pool: &SqlitePool) -> Result<Vec<TrackedTicker>, sqlx::Error> {
    sqlx::query_as::<_, TrackedTicker>(&format!(
        "SELECT {} FROM user_tickers ORDER BY symbol ASC",
        TICKER_COLUMNS
    ))
    .fetch_all(pool)
    .await
}

pub async fn by_favorite(
    pool: &SqlitePool,
    favorite: bool,
) -> Result<Vec<TrackedTicker>, sqlx::Error> {
    sqlx::query_as::<_, TrackedTicker>(&format!(
        "SELECT {} FROM user_tickers WHERE is_favorite = ? ORDER BY symbol ASC",
        TICKER_COLUMNS
    ))
    .bind(favorite)
    .fetch_all(pool)
    .await
}

pub async fn by_exchange(
    pool: &SqlitePool,
    exchange: &str,
) -> Result<Vec<TrackedTicker>, sqlx::Error> {
    sqlx::query_as::<_, TrackedTicker>(&format!(
        "SELECT {} FROM user_tickers WHERE exchange = ? ORDER BY symbol ASC",
        TICKER_COLUMNS
    ))
    .bind(exchange)
    .fetch_all(pool)
    .await
}

pub async fn by_name_prefix(
    pool: &SqlitePool,
    prefix: &str,
) -> Result<Vec<TrackedTicker>, sqlx::Error> {
    sqlx::query_as::<_, TrackedTicker>(&format!(
        "SELECT {} FROM user_tickers WHERE name LIKE ? ESCAPE '\\' ORDER BY symbol ASC",
        TICKER_COLUMNS
    ))
    .bind(format!("{}%", escape_like(prefix)))
    .fetch_all(pool)
    .await
}

pub async fn set_favorite(
    pool: &SqlitePool,
    symbol: &str,
    favorite: bool,
) -> Result<Option<TrackedTicker>, sqlx::Error> {
    sqlx::query_as::<_, TrackedTicker>(&format!(
        "UPDATE user_tickers SET is_favorite = ? WHERE symbol = ? RETURNING {}",
        TICKER_COLUMNS
    ))
    .bind(favorite)
    .bind(symbol)
    .fetch_optional(pool)
    .await
}

pub async fn delete(pool: &SqlitePool, symbol: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM user_tickers WHERE symbol = ?")
        .bind(symbol)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
