pub mod clock;
pub mod config;
pub mod market_data;
