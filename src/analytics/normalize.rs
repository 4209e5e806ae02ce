use ndarray::ArrayView1;

use super::types::{DerivedColumn, DerivedTable, PriceTable};
use crate::error::MetricError;

/// Rebases every column so its first observation equals `base`. The market
/// index column is labelled `market_label`.
pub fn normalize(table: &PriceTable, base: f64, market_label: &str) -> DerivedTable {
    let columns = (0..table.columns().len())
        .map(|i| DerivedColumn {
            name: column_label(table, i, market_label),
            values: rebase(table.column(i), base),
        })
        .collect();

    DerivedTable {
        dates: table.dates().to_vec(),
        columns,
    }
}

fn rebase(prices: ArrayView1<'_, f64>, base: f64) -> Result<Vec<f64>, MetricError> {
    let first = first_price(prices)?;
    Ok(prices.mapv(|p| p / first * base).to_vec())
}

/// Column name for derived tables: instruments keep their symbol, the market
/// index takes its display label.
pub(crate) fn column_label(table: &PriceTable, index: usize, market_label: &str) -> String {
    if index == table.market_column() {
        market_label.to_string()
    } else {
        table.columns()[index].clone()
    }
}

/// First price of a column; zero or missing makes every rebased value undefined.
pub(crate) fn first_price(prices: ArrayView1<'_, f64>) -> Result<f64, MetricError> {
    match prices.get(0) {
        Some(&first) if first != 0.0 && first.is_finite() => Ok(first),
        Some(_) => Err(MetricError::ZeroFirstPrice),
        None => Err(MetricError::InsufficientObservations {
            required: 1,
            actual: 0,
        }),
    }
}
