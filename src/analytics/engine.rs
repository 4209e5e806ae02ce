use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

use super::{
    capm, cumulative, normalize, regression, returns, risk,
    types::{
        AnalysisSettings, AnalyticsReport, DerivedColumn, MarketIndex, Metric, PerformanceRecord,
        PerformanceTable, PriceTable,
    },
};
use crate::error::MetricError;

/// Runs every analytics stage over an aligned price table.
///
/// Stages run in order (normalize, returns, cumulative, then the
/// per-instrument metrics). Per-instrument work is independent and runs in
/// parallel; degenerate metrics stay local to their instrument.
#[instrument(
    name = "analytics",
    skip_all,
    fields(on_close = true, instruments = table.instrument_columns().len(), rows = table.n_rows())
)]
pub fn run_analytics(table: &PriceTable, market: &MarketIndex, settings: &AnalysisSettings) -> AnalyticsReport {
    info!("Starting analytics run...");

    let normalized = normalize::normalize(table, settings.normalization_base, &market.display_name);
    let returns = returns::daily_returns(table);
    let cumulative = cumulative::cumulative_returns(table, &market.display_name);
    debug!(return_rows = returns.n_rows(), "Derived tables calculated");

    let market_returns: Result<Vec<f64>, MetricError> = match returns.market() {
        Some(column) => column.values.clone(),
        None => Err(MetricError::InsufficientObservations {
            required: 2,
            actual: 0,
        }),
    };
    let market_return = market_returns
        .as_ref()
        .map_err(Clone::clone)
        .and_then(|r| capm::market_annual_return(r, settings.trading_days_per_year));
    match &market_return {
        Ok(value) => debug!(market = %market.symbol, market_return = value, "Market return calculated"),
        Err(reason) => warn!(market = %market.symbol, %reason, "Market return unavailable"),
    }

    // Same ordering as the instrument columns
    let records: Vec<PerformanceRecord> = returns
        .instrument_columns()
        .par_iter()
        .map(|column| evaluate_instrument(column, &market_returns, &market_return, settings))
        .collect();

    for record in &records {
        for (metric, value) in record.metrics() {
            if let Err(reason) = value {
                warn!(symbol = %record.symbol, metric, %reason, "Metric unavailable");
            }
        }
    }
    info!(instruments = records.len(), "Performance metrics calculated");

    AnalyticsReport {
        market: market.clone(),
        settings: settings.clone(),
        date_range: table.dates().first().copied().zip(table.dates().last().copied()),
        normalized,
        returns,
        cumulative,
        market_return,
        performance: PerformanceTable::new(records),
    }
}

/// All metrics for one instrument. Pure; safe to run on any thread.
fn evaluate_instrument(
    column: &DerivedColumn,
    market_returns: &Result<Vec<f64>, MetricError>,
    market_return: &Metric,
    settings: &AnalysisSettings,
) -> PerformanceRecord {
    let instrument_returns = match &column.values {
        Ok(values) => values,
        Err(reason) => return PerformanceRecord::unavailable(column.name.clone(), reason.clone()),
    };

    let rf = settings.risk_free_rate.fraction();
    let days = settings.trading_days_per_year;

    let fit = market_returns
        .as_ref()
        .map_err(Clone::clone)
        .and_then(|market| regression::estimate_beta_alpha(instrument_returns, market));
    let beta = fit.as_ref().map(|f| f.beta).map_err(Clone::clone);
    let alpha = fit.map(|f| f.alpha);

    PerformanceRecord {
        symbol: column.name.clone(),
        expected_return: capm::capm_expected_return(rf, &beta, market_return),
        beta,
        alpha,
        sharpe_ratio: risk::sharpe_ratio(instrument_returns, rf, days),
        volatility: risk::annualized_volatility(instrument_returns, days),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::types::{PriceSeries, RiskFreeRate};
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use rstest::{fixture, rstest};

    fn series(symbol: &str, prices: &[f64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        PriceSeries::new(
            symbol,
            prices
                .iter()
                .enumerate()
                .map(|(i, p)| (start + chrono::Days::new(i as u64), *p))
                .collect(),
        )
        .unwrap()
    }

    #[fixture]
    fn market_prices() -> Vec<f64> {
        vec![100.0, 101.0, 99.5, 102.0, 103.5, 101.0, 104.0, 105.5, 104.0, 106.0]
    }

    #[fixture]
    fn market() -> MarketIndex {
        MarketIndex::new("SP500", "S&P 500")
    }

    #[rstest]
    fn instrument_tracking_market_has_unit_beta(market_prices: Vec<f64>, market: MarketIndex) {
        let twin: Vec<f64> = market_prices.iter().map(|p| p * 2.0).collect();
        let table = PriceTable::inner_join(&[series("TWIN", &twin)], &series("SP500", &market_prices));

        let report = run_analytics(&table, &market, &AnalysisSettings::default());
        let record = report.performance.get("TWIN").unwrap();

        assert_relative_eq!(*record.beta.as_ref().unwrap(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(*record.alpha.as_ref().unwrap(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(
            *record.expected_return.as_ref().unwrap(),
            *report.market_return.as_ref().unwrap(),
            epsilon = 1e-12
        );
    }

    #[rstest]
    fn flat_instrument_keeps_other_metrics(market_prices: Vec<f64>, market: MarketIndex) {
        let table = PriceTable::inner_join(
            &[series("FLAT", &[100.0; 10]), series("LIVE", &market_prices)],
            &series("SP500", &market_prices),
        );
        let report = run_analytics(&table, &market, &AnalysisSettings::default());

        let flat = report.performance.get("FLAT").unwrap();
        assert_eq!(flat.volatility, Ok(0.0));
        assert_eq!(flat.sharpe_ratio, Err(MetricError::ZeroVolatility));
        assert_eq!(flat.beta, Ok(0.0));
        assert_relative_eq!(*flat.expected_return.as_ref().unwrap(), 0.045, epsilon = 1e-12);

        let live = report.performance.get("LIVE").unwrap();
        assert!(live.sharpe_ratio.is_ok());
        assert_eq!(report.performance.len(), 2);
    }

    #[rstest]
    fn flat_market_leaves_volatility_available(market_prices: Vec<f64>, market: MarketIndex) {
        let table = PriceTable::inner_join(&[series("LIVE", &market_prices)], &series("SP500", &[50.0; 10]));
        let settings = AnalysisSettings {
            risk_free_rate: RiskFreeRate::from_percent(0.0),
            ..AnalysisSettings::default()
        };
        let report = run_analytics(&table, &market, &settings);
        let live = report.performance.get("LIVE").unwrap();

        assert_eq!(live.beta, Err(MetricError::ZeroMarketVariance));
        assert_eq!(live.alpha, Err(MetricError::ZeroMarketVariance));
        assert_eq!(live.expected_return, Err(MetricError::ZeroMarketVariance));
        assert!(live.volatility.is_ok());
        assert!(live.sharpe_ratio.is_ok());
        assert_eq!(report.market_return, Ok(0.0));
    }

    #[rstest]
    fn zero_price_instrument_is_unavailable(market_prices: Vec<f64>, market: MarketIndex) {
        let mut broken = market_prices.clone();
        broken[3] = 0.0;
        let table = PriceTable::inner_join(
            &[series("BROKEN", &broken), series("LIVE", &market_prices)],
            &series("SP500", &market_prices),
        );
        let report = run_analytics(&table, &market, &AnalysisSettings::default());

        let record = report.performance.get("BROKEN").unwrap();
        for (_, metric) in record.metrics() {
            assert!(matches!(metric, Err(MetricError::ZeroPrice { .. })));
        }
        assert!(report.performance.get("LIVE").unwrap().beta.is_ok());
    }

    #[rstest]
    fn tiny_price_never_surfaces_as_nan(market_prices: Vec<f64>, market: MarketIndex) {
        let mut tiny = market_prices.clone();
        tiny[..5].copy_from_slice(&[10.0, 1e-320, 5.0, 5.5, 6.0]);
        let table = PriceTable::inner_join(
            &[series("TINY", &tiny), series("LIVE", &market_prices)],
            &series("SP500", &market_prices),
        );
        let report = run_analytics(&table, &market, &AnalysisSettings::default());

        let record = report.performance.get("TINY").unwrap();
        for (name, metric) in record.metrics() {
            assert!(
                matches!(metric, Err(MetricError::NonFiniteReturn { .. })),
                "{name}: {metric:?}"
            );
        }
        for record in report.performance.records() {
            for (_, metric) in record.metrics() {
                if let Ok(value) = metric {
                    assert!(value.is_finite());
                }
            }
        }
        assert!(report.performance.get("LIVE").unwrap().beta.is_ok());
    }

    #[rstest]
    fn records_follow_selection_order(market_prices: Vec<f64>, market: MarketIndex) {
        let names = ["MSFT", "AAPL", "NVDA", "AMZN"];
        let instruments: Vec<PriceSeries> = names.iter().map(|n| series(n, &market_prices)).collect();
        let table = PriceTable::inner_join(&instruments, &series("SP500", &market_prices));
        let report = run_analytics(&table, &market, &AnalysisSettings::default());

        let order: Vec<&str> = report.performance.records().iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(order, names);
        assert_eq!(report.normalized.columns.last().unwrap().name, "S&P 500");
        assert_eq!(report.cumulative.columns.last().unwrap().name, "S&P 500");
    }
}
