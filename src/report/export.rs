use std::fs;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::info;

use super::ReportError;
use crate::analytics::types::{
    serialize_metric, AnalysisSettings, AnalyticsReport, DerivedTable, MarketIndex, Metric, PerformanceTable,
};

#[derive(Serialize)]
struct ReportDocument<'a> {
    generated_at: DateTime<Utc>,
    settings: &'a AnalysisSettings,
    market: &'a MarketIndex,
    date_range: Option<DateSpan>,
    #[serde(serialize_with = "serialize_metric")]
    market_return: Metric,
    performance: &'a PerformanceTable,
}

#[derive(Serialize)]
struct DateSpan {
    start: NaiveDate,
    end: NaiveDate,
}

/// Writes the run summary as pretty JSON. Metrics are `{"value": x}` or
/// `{"unavailable": reason}`.
pub fn write_report_json(report: &AnalyticsReport, path: &Path) -> Result<(), ReportError> {
    let document = ReportDocument {
        generated_at: Utc::now(),
        settings: &report.settings,
        market: &report.market,
        date_range: report.date_range.map(|(start, end)| DateSpan { start, end }),
        market_return: report.market_return.clone(),
        performance: &report.performance,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(&document)?)?;
    info!(path = %path.display(), "Wrote report JSON");
    Ok(())
}

/// Writes a derived table as `date,<col>,...`. Columns that could not be
/// computed are written as empty cells.
pub fn write_table_csv(table: &DerivedTable, path: &Path) -> Result<(), ReportError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;

    let mut header = vec!["date".to_string()];
    header.extend(table.columns.iter().map(|c| c.name.clone()));
    writer.write_record(&header)?;

    for (row, date) in table.dates.iter().enumerate() {
        let mut record = vec![date.to_string()];
        record.extend(table.columns.iter().map(|column| match &column.values {
            Ok(values) => values.get(row).map(|v| v.to_string()).unwrap_or_default(),
            Err(_) => String::new(),
        }));
        writer.write_record(&record)?;
    }
    writer.flush()?;

    info!(path = %path.display(), rows = table.n_rows(), "Wrote table CSV");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::types::DerivedColumn;
    use crate::error::MetricError;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    #[test]
    fn csv_leaves_unavailable_columns_blank() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("normalized.csv");
        let table = DerivedTable {
            dates: vec![day(1), day(2)],
            columns: vec![
                DerivedColumn { name: "AAPL".into(), values: Ok(vec![1.0, 1.5]) },
                DerivedColumn { name: "ZERO".into(), values: Err(MetricError::ZeroFirstPrice) },
                DerivedColumn { name: "SP500".into(), values: Ok(vec![1.0, 0.5]) },
            ],
        };

        write_table_csv(&table, &path).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines[0], "date,AAPL,ZERO,SP500");
        assert_eq!(lines[1], "2024-05-01,1,,1");
        assert_eq!(lines[2], "2024-05-02,1.5,,0.5");
    }
}
