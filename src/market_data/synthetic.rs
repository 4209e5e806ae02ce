use chrono::{Datelike, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use std::f64::consts::E;

use super::{DateRange, PriceProvider};
use crate::analytics::types::PriceSeries;
use crate::error::ProviderError;

const TRADING_DAYS: f64 = 252.0;
const MARKET_DRIFT: f64 = 0.08; // annual
const MARKET_VOLATILITY: f64 = 0.18; // annual
const IDIOSYNCRATIC_VOLATILITY: f64 = 0.25; // annual
const MARKET_START_LEVEL: f64 = 4000.0;

/// Deterministic price paths for offline runs.
///
/// The market index is a geometric Brownian motion driven by `seed`. Every
/// other symbol loads on the same market shocks with a beta derived from its
/// name plus its own noise, so runs are reproducible and betas are
/// meaningful.
#[derive(Debug, Clone)]
pub struct SyntheticProvider {
    seed: u64,
    market_symbol: String,
}

impl SyntheticProvider {
    pub fn new(seed: u64, market_symbol: impl Into<String>) -> Self {
        Self {
            seed,
            market_symbol: market_symbol.into(),
        }
    }

    /// Beta assigned to `symbol`, in `[0.4, 1.9)`.
    pub fn beta_for(symbol: &str) -> f64 {
        0.4 + 1.5 * unit_interval(fnv1a(symbol.as_bytes()))
    }

    fn market_log_returns(&self, days: usize) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mu = MARKET_DRIFT / TRADING_DAYS;
        let sigma = MARKET_VOLATILITY / TRADING_DAYS.sqrt();
        (0..days)
            .map(|_| {
                let z: f64 = rng.sample(StandardNormal);
                (mu - 0.5 * sigma * sigma) + sigma * z
            })
            .collect()
    }

    fn instrument_log_returns(&self, symbol: &str, market: &[f64]) -> Vec<f64> {
        let hash = fnv1a(symbol.as_bytes());
        let mut rng = StdRng::seed_from_u64(self.seed ^ hash);
        let beta = Self::beta_for(symbol);
        let sigma = IDIOSYNCRATIC_VOLATILITY / TRADING_DAYS.sqrt();
        market
            .iter()
            .map(|m| {
                let z: f64 = rng.sample(StandardNormal);
                beta * m - 0.5 * sigma * sigma + sigma * z
            })
            .collect()
    }
}

impl PriceProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    async fn fetch_close_prices(&self, symbol: &str, range: &DateRange) -> Result<PriceSeries, ProviderError> {
        let dates = business_days(range);
        let market = self.market_log_returns(dates.len());

        let (start_price, log_returns) = if symbol == self.market_symbol {
            (MARKET_START_LEVEL, market)
        } else {
            let start = 20.0 + 480.0 * unit_interval(fnv1a(symbol.as_bytes()).rotate_left(17));
            (start, self.instrument_log_returns(symbol, &market))
        };

        // First business day sits at the start price; each later day compounds one shock
        let mut price = start_price;
        let observations = dates
            .into_iter()
            .zip(log_returns)
            .enumerate()
            .map(|(i, (date, log_return))| {
                if i > 0 {
                    price *= E.powf(log_return);
                }
                (date, price)
            })
            .collect();

        PriceSeries::new(symbol, observations)
    }
}

fn business_days(range: &DateRange) -> Vec<NaiveDate> {
    range
        .start
        .iter_days()
        .take_while(|d| *d <= range.end)
        .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
        .collect()
}

// Stable across platforms and releases, unlike the std hasher
fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(0x0100_0000_01b3)
    })
}

fn unit_interval(hash: u64) -> f64 {
    (hash >> 11) as f64 / (1u64 << 53) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
        )
    }

    #[tokio::test]
    async fn paths_are_reproducible_and_skip_weekends() {
        let provider = SyntheticProvider::new(7, "SP500");
        let first = provider.fetch_close_prices("AAPL", &range()).await.unwrap();
        let second = provider.fetch_close_prices("AAPL", &range()).await.unwrap();

        assert_eq!(first, second);
        assert!(first.dates().iter().all(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun)));
        assert!(first.prices().iter().all(|p| *p > 0.0));
    }

    #[tokio::test]
    async fn symbols_share_the_calendar() {
        let provider = SyntheticProvider::new(7, "SP500");
        let market = provider.fetch_close_prices("SP500", &range()).await.unwrap();
        let stock = provider.fetch_close_prices("MSFT", &range()).await.unwrap();

        assert_eq!(market.dates(), stock.dates());
        assert_eq!(market.prices()[0], MARKET_START_LEVEL);
        assert_ne!(market.prices(), stock.prices());
    }

    #[test]
    fn betas_stay_in_band() {
        for symbol in ["AAPL", "TSLA", "AMZN", "GOOGL", "JPM", "XOM"] {
            let beta = SyntheticProvider::beta_for(symbol);
            assert!((0.4..1.9).contains(&beta), "{symbol}: {beta}");
        }
    }
}
