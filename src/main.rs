use std::sync::Arc;

use sqlx::sqlite::SqlitePoolOptions;
use tokio::sync::{watch, Mutex};

use tickerdeck::external::alpaca::AlpacaProvider;
use tickerdeck::external::market_data::MarketDataProvider;
use tickerdeck::jobs::{JobContext, RefreshSnapshot};
use tickerdeck::logging::{init_logging, LoggingConfig};
use tickerdeck::services::refresh_scheduler::RefreshScheduler;
use tickerdeck::services::settings_service;

const DEFAULT_DATABASE_URL: &str = "sqlite://tickerdeck.db?mode=rwc";
const DEFAULT_REFRESH_INTERVAL: i64 = 10;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    init_logging(LoggingConfig::from_env())
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    // Stored credentials win; the env pair is the bootstrap path before
    // settings exist.
    let settings = settings_service::get_user_settings(&pool).await?;
    let provider: Arc<dyn MarketDataProvider> = match &settings {
        Some(s) => Arc::new(AlpacaProvider::new(s.api_key.clone(), s.api_secret.clone())),
        None => {
            tracing::info!("no stored settings, using APCA_* environment credentials");
            Arc::new(
                AlpacaProvider::from_env()
                    .map_err(|e| anyhow::anyhow!("no usable credentials: {}", e))?,
            )
        }
    };

    let interval = settings
        .as_ref()
        .map(|s| s.refresh_interval)
        .unwrap_or(DEFAULT_REFRESH_INTERVAL);

    let (snapshot_tx, _) = watch::channel(RefreshSnapshot::default());
    let context = JobContext {
        pool,
        market_data: provider,
        snapshot_tx,
        in_flight: Arc::new(Mutex::new(())),
    };

    let mut scheduler = RefreshScheduler::new(context, interval).await?;
    let mut snapshot_rx = scheduler.subscribe();
    scheduler.start().await?;

    // Headless display: log each published snapshot until ctrl-c.
    let display = tokio::spawn(async move {
        while snapshot_rx.changed().await.is_ok() {
            let snapshot = snapshot_rx.borrow_and_update().clone();
            let mut symbols: Vec<_> = snapshot.changes.keys().cloned().collect();
            symbols.sort();
            for symbol in symbols {
                let change = snapshot.changes[&symbol];
                let close = snapshot.latest_close.get(&symbol).copied().unwrap_or(0.0);
                tracing::info!("{:<8} {:>10.2} {:>+7.2}%", symbol, close, change);
            }
        }
    });

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    scheduler.shutdown().await?;
    display.abort();

    Ok(())
}
