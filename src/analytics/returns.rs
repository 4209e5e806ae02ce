use chrono::NaiveDate;
use ndarray::ArrayView1;

use super::types::{DerivedColumn, PriceTable, ReturnTable};
use crate::error::MetricError;

/// Simple daily returns `(p[t] - p[t-1]) / p[t-1]` as fractions.
///
/// The first date has no predecessor and is dropped, so the result has one
/// row fewer than `table`. A zero price, or one so small the return overflows,
/// marks that column unavailable instead of letting an infinite return reach
/// the regressions.
pub fn daily_returns(table: &PriceTable) -> ReturnTable {
    let columns = table
        .columns()
        .iter()
        .enumerate()
        .map(|(i, name)| DerivedColumn {
            name: name.clone(),
            values: column_returns(table.dates(), table.column(i)),
        })
        .collect();

    ReturnTable {
        dates: table.dates().iter().skip(1).copied().collect(),
        columns,
    }
}

/// Returns for one column; `dates` is used to report where a zero price sits.
pub fn column_returns(dates: &[NaiveDate], prices: ArrayView1<'_, f64>) -> Result<Vec<f64>, MetricError> {
    if prices.len() < 2 {
        return Err(MetricError::InsufficientObservations {
            required: 2,
            actual: prices.len(),
        });
    }

    let mut returns = Vec::with_capacity(prices.len() - 1);
    for i in 1..prices.len() {
        let p0 = prices[i - 1];
        let p1 = prices[i];
        if p0 == 0.0 {
            return Err(MetricError::ZeroPrice { date: dates[i - 1] });
        }
        let r = (p1 - p0) / p0;
        if !r.is_finite() {
            return Err(MetricError::NonFiniteReturn { date: dates[i] });
        }
        returns.push(r);
    }

    Ok(returns)
}
