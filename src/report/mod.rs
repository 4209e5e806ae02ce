pub mod console;
pub mod dashboard;
pub mod export;
pub mod plots;

use thiserror::Error;

use crate::analytics::types::Metric;

pub use console::log_performance_table;
pub use dashboard::{render_dashboard, DashboardOptions};
pub use export::{write_report_json, write_table_csv};

/// Placeholder shown for any metric that could not be computed.
pub const UNAVAILABLE: &str = "n/a";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("price table is empty")]
    EmptyTable,
}

/// `1.234` style, or `n/a`.
pub fn format_number(metric: &Metric, decimals: usize) -> String {
    match metric {
        Ok(value) => format!("{value:.decimals$}"),
        Err(_) => UNAVAILABLE.to_string(),
    }
}

/// Fraction rendered as a percentage, `0.1275` -> `12.75%`.
pub fn format_percent(metric: &Metric) -> String {
    match metric {
        Ok(value) => format!("{:.2}%", value * 100.0),
        Err(_) => UNAVAILABLE.to_string(),
    }
}
