pub mod settings_queries;
pub mod ticker_queries;
