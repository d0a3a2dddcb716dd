pub mod historical_bars;
pub mod price_change;
pub mod refresh_scheduler;
pub mod safe_store;
pub mod settings_service;
pub mod ticker_service;
pub mod trading_calendar;
