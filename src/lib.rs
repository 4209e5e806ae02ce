pub mod analytics;
pub mod config;
pub mod error;
pub mod logging;
pub mod market_data;
pub mod pipeline;
pub mod report;
