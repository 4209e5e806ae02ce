use super::normalize::{column_label, first_price};
use super::types::{DerivedColumn, DerivedTable, PriceTable};

/// Percentage growth of every column relative to its first price,
/// `(p[t] / p[0] - 1) * 100`. The market index column is labelled
/// `market_label` so it reads as the comparison line.
pub fn cumulative_returns(table: &PriceTable, market_label: &str) -> DerivedTable {
    let columns = (0..table.columns().len())
        .map(|i| {
            let prices = table.column(i);
            let values = first_price(prices)
                .map(|first| prices.mapv(|p| (p / first - 1.0) * 100.0).to_vec());
            DerivedColumn {
                name: column_label(table, i, market_label),
                values,
            }
        })
        .collect();

    DerivedTable {
        dates: table.dates().to_vec(),
        columns,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::types::PriceSeries;
    use crate::error::MetricError;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn table(a: &[f64], market: &[f64]) -> PriceTable {
        let dates: Vec<NaiveDate> = (0..a.len())
            .map(|i| NaiveDate::from_ymd_opt(2024, 2, 1 + i as u32).unwrap())
            .collect();
        let a = PriceSeries::new("A", dates.iter().copied().zip(a.iter().copied()).collect()).unwrap();
        let m = PriceSeries::new("SP500", dates.iter().copied().zip(market.iter().copied()).collect()).unwrap();
        PriceTable::inner_join(&[a], &m)
    }

    #[test]
    fn starts_at_zero_and_tracks_growth() {
        let cumulative = cumulative_returns(&table(&[50.0, 60.0, 40.0], &[200.0, 210.0, 220.0]), "S&P 500");

        let a = cumulative.column("A").unwrap().values.as_ref().unwrap();
        assert_eq!(a[0], 0.0);
        assert_relative_eq!(a[1], 20.0, epsilon = 1e-12);
        assert_relative_eq!(a[2], -20.0, epsilon = 1e-12);

        let market = cumulative.column("S&P 500").unwrap().values.as_ref().unwrap();
        assert_eq!(market[0], 0.0);
        assert_relative_eq!(market[2], 10.0, epsilon = 1e-12);
    }

    #[test]
    fn zero_first_price_is_unavailable() {
        let cumulative = cumulative_returns(&table(&[0.0, 1.0], &[200.0, 210.0]), "S&P 500");
        assert_eq!(cumulative.columns[0].values, Err(MetricError::ZeroFirstPrice));
        assert!(cumulative.columns[1].values.is_ok());
    }
}
