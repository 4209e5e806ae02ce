pub mod acquire;
pub mod csv_store;
pub mod fred;
pub mod http;
pub mod memory;
pub mod synthetic;
pub mod yahoo;

use chrono::{Months, NaiveDate};

use crate::analytics::types::PriceSeries;
use crate::error::ProviderError;

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// The `years` years ending on `end`, clamped to the earliest
    /// representable date.
    pub fn trailing_years(end: NaiveDate, years: u32) -> Self {
        let start = 12u32
            .checked_mul(years)
            .and_then(|months| end.checked_sub_months(Months::new(months)))
            .unwrap_or(NaiveDate::MIN);
        Self { start, end }
    }
}

/// A source of daily closing prices.
#[allow(async_fn_in_trait)]
pub trait PriceProvider {
    /// Short label used in logs.
    fn name(&self) -> &str;

    /// Closing prices for `symbol` within `range`, ascending by date.
    async fn fetch_close_prices(&self, symbol: &str, range: &DateRange) -> Result<PriceSeries, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn trailing_years_steps_back_whole_years() {
        let end = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let range = DateRange::trailing_years(end, 1);
        assert_eq!(range.start, NaiveDate::from_ymd_opt(2023, 2, 28).unwrap());
        assert_eq!(range.end, end);
    }

    #[rstest]
    #[case(400_000)]
    #[case(400_000_000)]
    #[case(u32::MAX)]
    fn huge_horizon_clamps_to_earliest_date(#[case] years: u32) {
        let end = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let range = DateRange::trailing_years(end, years);
        assert_eq!(range.start, NaiveDate::MIN);
        assert_eq!(range.end, end);
    }
}
