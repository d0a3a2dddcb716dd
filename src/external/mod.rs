pub mod alpaca;
pub mod market_data;
