use std::collections::HashMap;

use super::{DateRange, PriceProvider};
use crate::analytics::types::PriceSeries;
use crate::error::ProviderError;

/// Serves price series already held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    series: HashMap<String, PriceSeries>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(mut self, series: PriceSeries) -> Self {
        self.insert(series);
        self
    }

    pub fn insert(&mut self, series: PriceSeries) {
        self.series.insert(series.symbol().to_string(), series);
    }
}

impl PriceProvider for InMemoryProvider {
    fn name(&self) -> &str {
        "memory"
    }

    async fn fetch_close_prices(&self, symbol: &str, range: &DateRange) -> Result<PriceSeries, ProviderError> {
        self.series
            .get(symbol)
            .map(|series| series.within(range.start, range.end))
            .ok_or(ProviderError::UnknownSymbol)
    }
}
