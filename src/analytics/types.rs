use std::collections::HashMap;

use chrono::NaiveDate;
use ndarray::{Array2, ArrayView1};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::error::{MetricError, ProviderError};

/// A metric value, or the reason it is unavailable.
pub type Metric = Result<f64, MetricError>;

/// Closing prices for one symbol, ascending by date with unique dates.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    symbol: String,
    dates: Vec<NaiveDate>,
    prices: Vec<f64>,
}

impl PriceSeries {
    /// Builds a series from unordered observations. Sorts by date and rejects
    /// duplicate dates and non-finite prices. An empty series is allowed here;
    /// acquisition decides whether "no data" is acceptable.
    pub fn new(
        symbol: impl Into<String>,
        mut observations: Vec<(NaiveDate, f64)>,
    ) -> Result<Self, ProviderError> {
        observations.sort_by_key(|(date, _)| *date);

        for window in observations.windows(2) {
            if window[0].0 == window[1].0 {
                return Err(ProviderError::DuplicateDate { date: window[0].0 });
            }
        }
        if let Some((date, _)) = observations.iter().find(|(_, price)| !price.is_finite()) {
            return Err(ProviderError::NonFinitePrice { date: *date });
        }

        let (dates, prices) = observations.into_iter().unzip();
        Ok(Self {
            symbol: symbol.into(),
            dates,
            prices,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn prices(&self) -> &[f64] {
        &self.prices
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn observations(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.dates.iter().copied().zip(self.prices.iter().copied())
    }

    /// Restricts the series to `start..=end`.
    pub fn within(&self, start: NaiveDate, end: NaiveDate) -> Self {
        let (dates, prices) = self
            .observations()
            .filter(|(date, _)| *date >= start && *date <= end)
            .unzip();
        Self {
            symbol: self.symbol.clone(),
            dates,
            prices,
        }
    }
}

/// Date-indexed prices, one column per instrument followed by the market
/// index column. Every row carries a value for every column.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceTable {
    dates: Vec<NaiveDate>,
    columns: Vec<String>,
    prices: Array2<f64>,
}

impl PriceTable {
    /// Inner-joins the instrument series with the market series on date.
    pub fn inner_join(instruments: &[PriceSeries], market: &PriceSeries) -> Self {
        let lookups: Vec<HashMap<NaiveDate, f64>> = instruments
            .iter()
            .map(|series| series.observations().collect())
            .collect();

        let mut dates = Vec::new();
        let mut values = Vec::new();
        for (date, market_price) in market.observations() {
            let row: Option<Vec<f64>> = lookups
                .iter()
                .map(|lookup| lookup.get(&date).copied())
                .collect();
            if let Some(mut row) = row {
                row.push(market_price);
                dates.push(date);
                values.extend(row);
            }
        }

        let mut columns: Vec<String> = instruments.iter().map(|s| s.symbol.clone()).collect();
        columns.push(market.symbol.clone());

        let prices = Array2::from_shape_vec((dates.len(), columns.len()), values)
            .unwrap_or_else(|_| Array2::zeros((0, columns.len())));

        Self {
            dates,
            columns,
            prices,
        }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// All column names, market index last.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn instrument_columns(&self) -> &[String] {
        &self.columns[..self.market_column()]
    }

    pub fn market_symbol(&self) -> &str {
        &self.columns[self.market_column()]
    }

    pub fn market_column(&self) -> usize {
        self.columns.len() - 1
    }

    pub fn n_rows(&self) -> usize {
        self.dates.len()
    }

    pub fn column(&self, index: usize) -> ArrayView1<'_, f64> {
        self.prices.column(index)
    }

    pub fn column_by_name(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
        let index = self.columns.iter().position(|c| c == name)?;
        Some(self.prices.column(index))
    }

    pub fn row(&self, index: usize) -> ArrayView1<'_, f64> {
        self.prices.row(index)
    }

    /// Row indices of the first `n` rows.
    pub fn head(&self, n: usize) -> std::ops::Range<usize> {
        0..n.min(self.n_rows())
    }

    /// Row indices of the last `n` rows.
    pub fn tail(&self, n: usize) -> std::ops::Range<usize> {
        self.n_rows().saturating_sub(n)..self.n_rows()
    }
}

/// One column of a table derived from prices. Columns whose values cannot be
/// computed keep their place in the table and carry the reason instead.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedColumn {
    pub name: String,
    pub values: Result<Vec<f64>, MetricError>,
}

/// Table derived from a `PriceTable` (normalized prices, returns, cumulative
/// returns). Same column order as the source, market index last.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedTable {
    pub dates: Vec<NaiveDate>,
    pub columns: Vec<DerivedColumn>,
}

/// Daily returns; one row fewer than the price table it came from.
pub type ReturnTable = DerivedTable;

impl DerivedTable {
    pub fn n_rows(&self) -> usize {
        self.dates.len()
    }

    pub fn column(&self, name: &str) -> Option<&DerivedColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn instrument_columns(&self) -> &[DerivedColumn] {
        &self.columns[..self.columns.len().saturating_sub(1)]
    }

    pub fn market(&self) -> Option<&DerivedColumn> {
        self.columns.last()
    }
}

/// Slope and intercept of instrument returns regressed on market returns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BetaAlpha {
    pub beta: f64,
    /// Daily intercept.
    pub alpha: f64,
}

/// Annual risk-free rate. Configured in percent, computed with as a fraction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskFreeRate {
    percent: f64,
}

impl RiskFreeRate {
    pub fn from_percent(percent: f64) -> Self {
        Self { percent }
    }

    pub fn percent(&self) -> f64 {
        self.percent
    }

    pub fn fraction(&self) -> f64 {
        self.percent / 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisSettings {
    pub risk_free_rate: RiskFreeRate,
    pub trading_days_per_year: u32,
    pub normalization_base: f64,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            risk_free_rate: RiskFreeRate::from_percent(4.5),
            trading_days_per_year: 252,
            normalization_base: 1.0,
        }
    }
}

/// The benchmark the instruments are measured against.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketIndex {
    pub symbol: String,
    pub display_name: String,
}

impl MarketIndex {
    pub fn new(symbol: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            display_name: display_name.into(),
        }
    }
}

/// Per-instrument metrics. Annualized values are fractions (0.12 = 12%).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceRecord {
    pub symbol: String,
    #[serde(serialize_with = "serialize_metric")]
    pub beta: Metric,
    #[serde(serialize_with = "serialize_metric")]
    pub alpha: Metric,
    #[serde(serialize_with = "serialize_metric")]
    pub expected_return: Metric,
    #[serde(serialize_with = "serialize_metric")]
    pub sharpe_ratio: Metric,
    #[serde(serialize_with = "serialize_metric")]
    pub volatility: Metric,
}

impl PerformanceRecord {
    /// Record for an instrument whose returns could not be computed at all.
    pub fn unavailable(symbol: impl Into<String>, reason: MetricError) -> Self {
        Self {
            symbol: symbol.into(),
            beta: Err(reason.clone()),
            alpha: Err(reason.clone()),
            expected_return: Err(reason.clone()),
            sharpe_ratio: Err(reason.clone()),
            volatility: Err(reason),
        }
    }

    /// Named metrics in display order.
    pub fn metrics(&self) -> [(&'static str, &Metric); 5] {
        [
            ("beta", &self.beta),
            ("alpha", &self.alpha),
            ("expected_return", &self.expected_return),
            ("sharpe_ratio", &self.sharpe_ratio),
            ("volatility", &self.volatility),
        ]
    }
}

/// One record per selected instrument, in selection order.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct PerformanceTable {
    records: Vec<PerformanceRecord>,
}

impl PerformanceTable {
    pub fn new(records: Vec<PerformanceRecord>) -> Self {
        Self { records }
    }

    pub fn get(&self, symbol: &str) -> Option<&PerformanceRecord> {
        self.records.iter().find(|r| r.symbol == symbol)
    }

    pub fn records(&self) -> &[PerformanceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Everything the presentation layer needs from one run.
#[derive(Debug, Clone)]
pub struct AnalyticsReport {
    pub market: MarketIndex,
    pub settings: AnalysisSettings,
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    pub normalized: DerivedTable,
    pub returns: ReturnTable,
    pub cumulative: DerivedTable,
    /// Annualized mean market return (fraction).
    pub market_return: Metric,
    pub performance: PerformanceTable,
}

pub fn serialize_metric<S: Serializer>(metric: &Metric, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(1))?;
    match metric {
        Ok(value) => map.serialize_entry("value", value)?,
        Err(reason) => map.serialize_entry("unavailable", &reason.to_string())?,
    }
    map.end()
}
