use tracing::info;

use super::{format_number, format_percent};
use crate::analytics::types::AnalyticsReport;

/// Logs the performance overview, one line per instrument in selection order.
pub fn log_performance_table(report: &AnalyticsReport) {
    let rows = report
        .performance
        .records()
        .iter()
        .map(|record| {
            format!(
                "{}: Beta={}, Alpha={}, Expected Return={}, Sharpe={}, Volatility={}",
                record.symbol,
                format_number(&record.beta, 3),
                format_number(&record.alpha, 6),
                format_percent(&record.expected_return),
                format_number(&record.sharpe_ratio, 3),
                format_percent(&record.volatility),
            )
        })
        .collect::<Vec<_>>()
        .join("\n  ");

    let period = report
        .date_range
        .map(|(start, end)| format!("{start} to {end}"))
        .unwrap_or_else(|| "empty".to_string());

    info!(
        "Performance Overview vs {} ({}):\n  {}\n\nMarket Summary:\n  Annual Return: {}\n  Risk-Free Rate: {:.2}%",
        report.market.display_name,
        period,
        rows,
        format_percent(&report.market_return),
        report.settings.risk_free_rate.percent(),
    );
}
