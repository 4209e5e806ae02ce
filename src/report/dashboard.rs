use std::fs;
use std::path::PathBuf;

use chrono::NaiveDate;
use tracing::{info, instrument};

use super::plots::{self, escape_html};
use super::{format_number, format_percent, ReportError, UNAVAILABLE};
use crate::analytics::types::{AnalyticsReport, Metric, PerformanceRecord, PriceTable};

const DEFAULT_TITLE: &str = "CAPM Dashboard";
const DEFAULT_PREVIEW_ROWS: usize = 5;
const VERSION: &str = env!("CARGO_PKG_VERSION");
const TEMPLATE: &str = include_str!("dashboard_template.html");

pub struct DashboardOptions {
    pub title: String,
    /// Rows shown in each of the price head and tail tables.
    pub preview_rows: usize,
    pub output: Option<PathBuf>,
}

impl Default for DashboardOptions {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            preview_rows: DEFAULT_PREVIEW_ROWS,
            output: None,
        }
    }
}

impl DashboardOptions {
    pub fn with_title<S: Into<String>>(mut self, title: S) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_output<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.output = Some(path.into());
        self
    }

    pub fn with_preview_rows(mut self, rows: usize) -> Self {
        self.preview_rows = rows;
        self
    }
}

/// Renders the single-page dashboard and, when `options.output` is set,
/// writes it to disk.
#[instrument(name = "render_dashboard", skip_all, fields(on_close = true))]
pub fn render_dashboard(
    report: &AnalyticsReport,
    prices: &PriceTable,
    options: &DashboardOptions,
) -> Result<String, ReportError> {
    if prices.n_rows() == 0 {
        return Err(ReportError::EmptyTable);
    }

    let date_range = report
        .date_range
        .map(|(start, end)| format!("{} - {}", long_date(start), long_date(end)))
        .unwrap_or_default();
    let records = report.performance.records();
    let market_label = escape_html(&report.market.display_name);

    let mut page = TEMPLATE.to_string();
    page = page.replace("{{title}}", &escape_html(&options.title));
    page = page.replace("{{v}}", VERSION);
    page = page.replace("{{date_range}}", &date_range);
    page = page.replace("{{market}}", &market_label);
    page = page.replace(
        "{{risk_free_rate}}",
        &format!("{:.2}%", report.settings.risk_free_rate.percent()),
    );
    page = page.replace("{{market_return}}", &metric_text(&report.market_return, format_percent));

    page = page.replace("{{price_head}}", &price_table(prices, prices.head(options.preview_rows), &market_label));
    page = page.replace("{{price_tail}}", &price_table(prices, prices.tail(options.preview_rows), &market_label));

    let normalized_chart = plots::line_chart(
        &report.normalized.dates,
        &report.normalized.columns,
        "Normalized Prices",
        Some(report.settings.normalization_base),
    );
    page = page.replace("{{normalized_chart}}", &normalized_chart);

    page = page.replace(
        "{{beta_table}}",
        &metric_table(records, &["Beta", "Alpha (daily)"], |r| {
            vec![
                metric_cell(&r.beta, |m| format_number(m, 3)),
                metric_cell(&r.alpha, |m| format_number(m, 6)),
            ]
        }),
    );
    let betas: Vec<(String, Metric)> = records.iter().map(|r| (r.symbol.clone(), r.beta.clone())).collect();
    page = page.replace("{{beta_chart}}", &plots::bar_chart(&betas, "Beta vs Market", Some(1.0)));

    page = page.replace(
        "{{capm_table}}",
        &metric_table(records, &["Beta", "Expected Return"], |r| {
            vec![
                metric_cell(&r.beta, |m| format_number(m, 3)),
                metric_cell(&r.expected_return, format_percent),
            ]
        }),
    );
    page = page.replace(
        "{{sharpe_table}}",
        &metric_table(records, &["Sharpe Ratio"], |r| {
            vec![metric_cell(&r.sharpe_ratio, |m| format_number(m, 3))]
        }),
    );
    page = page.replace(
        "{{volatility_table}}",
        &metric_table(records, &["Annualized Volatility"], |r| {
            vec![metric_cell(&r.volatility, format_percent)]
        }),
    );

    let cumulative_chart = plots::line_chart(
        &report.cumulative.dates,
        &report.cumulative.columns,
        "Cumulative Returns",
        Some(0.0),
    );
    page = page.replace("{{cumulative_chart}}", &cumulative_chart);

    page = page.replace(
        "{{performance_table}}",
        &metric_table(
            records,
            &["Beta", "Alpha (daily)", "Expected Return", "Sharpe Ratio", "Volatility"],
            |r| {
                vec![
                    metric_cell(&r.beta, |m| format_number(m, 3)),
                    metric_cell(&r.alpha, |m| format_number(m, 6)),
                    metric_cell(&r.expected_return, format_percent),
                    metric_cell(&r.sharpe_ratio, |m| format_number(m, 3)),
                    metric_cell(&r.volatility, format_percent),
                ]
            },
        ),
    );

    if let Some(path) = &options.output {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, &page)?;
        info!(path = %path.display(), "Wrote dashboard");
    }

    Ok(page)
}

fn long_date(date: NaiveDate) -> String {
    date.format("%e %b, %Y").to_string().trim().to_string()
}

fn price_table(prices: &PriceTable, rows: std::ops::Range<usize>, market_label: &str) -> String {
    let mut html = String::from("<table><thead><tr><th>Date</th>");
    for symbol in prices.instrument_columns() {
        html.push_str(&format!("<th>{}</th>", escape_html(symbol)));
    }
    html.push_str(&format!("<th>{market_label}</th></tr></thead><tbody>"));

    for index in rows {
        html.push_str(&format!("<tr><td>{}</td>", prices.dates()[index]));
        for price in prices.row(index).iter() {
            html.push_str(&format!("<td>{price:.2}</td>"));
        }
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table>");
    html
}

fn metric_table<F>(records: &[PerformanceRecord], headers: &[&str], cells: F) -> String
where
    F: Fn(&PerformanceRecord) -> Vec<String>,
{
    let mut html = String::from("<table><thead><tr><th>Symbol</th>");
    for header in headers {
        html.push_str(&format!("<th>{header}</th>"));
    }
    html.push_str("</tr></thead><tbody>");

    for record in records {
        html.push_str(&format!("<tr><td>{}</td>", escape_html(&record.symbol)));
        for cell in cells(record) {
            html.push_str(&cell);
        }
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table>");
    html
}

// Unavailable cells carry the reason as a hover tooltip
fn metric_cell(metric: &Metric, render: impl Fn(&Metric) -> String) -> String {
    match metric {
        Ok(_) => format!("<td>{}</td>", render(metric)),
        Err(reason) => format!(
            r#"<td class="unavailable" title="{}">{UNAVAILABLE}</td>"#,
            escape_html(&reason.to_string())
        ),
    }
}

fn metric_text(metric: &Metric, render: impl Fn(&Metric) -> String) -> String {
    match metric {
        Ok(_) => render(metric),
        Err(reason) => format!(r#"<span class="unavailable" title="{}">{UNAVAILABLE}</span>"#, escape_html(&reason.to_string())),
    }
}
