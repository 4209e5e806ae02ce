use std::collections::HashMap;

use approx::assert_relative_eq;
use chrono::{Days, NaiveDate};
use rstest::{fixture, rstest};

use capm_dashboard::analytics::capm;
use capm_dashboard::analytics::types::PriceSeries;
use capm_dashboard::config::Config;
use capm_dashboard::error::{MetricError, PipelineError, ProviderError};
use capm_dashboard::market_data::csv_store::CsvPriceStore;
use capm_dashboard::market_data::memory::InMemoryProvider;
use capm_dashboard::market_data::synthetic::SyntheticProvider;
use capm_dashboard::pipeline::{run_from_config, run_pipeline};

const MARKET: &str = "SP500";

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
}

fn end() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 28).unwrap()
}

fn series(symbol: &str, prices: &[f64]) -> PriceSeries {
    let observations = prices
        .iter()
        .enumerate()
        .map(|(i, p)| (start().checked_add_days(Days::new(i as u64)).unwrap(), *p))
        .collect();
    PriceSeries::new(symbol, observations).unwrap()
}

fn config(pairs: &[(&str, &str)]) -> Config {
    let vars: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    Config::from_lookup(|key| vars.get(key).cloned()).unwrap()
}

#[fixture]
fn market_prices() -> Vec<f64> {
    vec![100.0, 101.5, 100.8, 102.9, 103.1, 101.7, 104.2, 105.0, 104.4, 106.3]
}

#[rstest]
#[tokio::test]
async fn constant_instrument_has_zero_beta_and_no_sharpe(market_prices: Vec<f64>) {
    let provider = InMemoryProvider::new()
        .with_series(series("FLAT", &[100.0; 10]))
        .with_series(series(MARKET, &market_prices));
    let cfg = config(&[("INSTRUMENTS", "FLAT")]);

    let output = run_pipeline(&provider, &provider, &cfg, end()).await.unwrap();
    let record = output.report.performance.get("FLAT").unwrap();

    assert_eq!(output.prices.n_rows(), 10);
    assert_relative_eq!(*record.beta.as_ref().unwrap(), 0.0);
    assert_relative_eq!(*record.volatility.as_ref().unwrap(), 0.0);
    assert_eq!(record.sharpe_ratio, Err(MetricError::ZeroVolatility));
}

#[tokio::test]
async fn flat_market_leaves_beta_unavailable_for_everyone() {
    let provider = InMemoryProvider::new()
        .with_series(series("FLAT", &[100.0; 10]))
        .with_series(series("AAPL", &[10.0, 10.5, 10.2, 10.9, 11.0, 10.7, 11.3, 11.1, 11.6, 11.8]))
        .with_series(series(MARKET, &[100.0; 10]));
    let cfg = config(&[("INSTRUMENTS", "FLAT,AAPL")]);

    let output = run_pipeline(&provider, &provider, &cfg, end()).await.unwrap();

    for symbol in ["FLAT", "AAPL"] {
        let record = output.report.performance.get(symbol).unwrap();
        assert_eq!(record.beta, Err(MetricError::ZeroMarketVariance));
        assert_eq!(record.expected_return, Err(MetricError::ZeroMarketVariance));
    }
    // Risk metrics do not depend on the market
    assert!(output.report.performance.get("AAPL").unwrap().sharpe_ratio.is_ok());
}

#[rstest]
#[tokio::test]
async fn instrument_tracking_the_market_earns_the_market_return(market_prices: Vec<f64>) {
    let twin: Vec<f64> = market_prices.iter().map(|p| p * 0.5).collect();
    let provider = InMemoryProvider::new()
        .with_series(series("TWIN", &twin))
        .with_series(series(MARKET, &market_prices));
    let cfg = config(&[("INSTRUMENTS", "TWIN")]);

    let output = run_pipeline(&provider, &provider, &cfg, end()).await.unwrap();
    let record = output.report.performance.get("TWIN").unwrap();
    let market_return = *output.report.market_return.as_ref().unwrap();

    assert_relative_eq!(*record.beta.as_ref().unwrap(), 1.0, epsilon = 1e-12);
    assert_relative_eq!(*record.alpha.as_ref().unwrap(), 0.0, epsilon = 1e-12);
    assert_relative_eq!(*record.expected_return.as_ref().unwrap(), market_return, epsilon = 1e-12);
}

#[test]
fn capm_matches_worked_example() {
    // rf 4.5%, market 10%, beta 1.5
    assert_relative_eq!(capm::expected_return(0.045, 1.5, 0.10), 0.1275, epsilon = 1e-12);
}

#[rstest]
#[tokio::test]
async fn empty_series_names_the_instrument(market_prices: Vec<f64>) {
    let provider = InMemoryProvider::new()
        .with_series(series("AAPL", &market_prices))
        .with_series(PriceSeries::new("TSLA", Vec::new()).unwrap())
        .with_series(series(MARKET, &market_prices));
    let cfg = config(&[("INSTRUMENTS", "AAPL,TSLA")]);

    let err = run_pipeline(&provider, &provider, &cfg, end()).await.unwrap_err();

    match err {
        PipelineError::DataAcquisition { symbol, source } => {
            assert_eq!(symbol, "TSLA");
            assert!(matches!(source, ProviderError::EmptySeries));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[rstest]
#[tokio::test]
async fn unknown_symbol_aborts_the_run(market_prices: Vec<f64>) {
    let provider = InMemoryProvider::new().with_series(series(MARKET, &market_prices));
    let cfg = config(&[("INSTRUMENTS", "NOPE")]);

    let err = run_pipeline(&provider, &provider, &cfg, end()).await.unwrap_err();

    assert!(matches!(
        err,
        PipelineError::DataAcquisition { ref symbol, source: ProviderError::UnknownSymbol } if symbol == "NOPE"
    ));
}

#[tokio::test]
async fn disjoint_calendars_fail_alignment() {
    let later = PriceSeries::new(
        "LATE",
        (0..10)
            .map(|i| (start().checked_add_days(Days::new(30 + i)).unwrap(), 50.0 + i as f64))
            .collect(),
    )
    .unwrap();
    let provider = InMemoryProvider::new()
        .with_series(later)
        .with_series(series(MARKET, &[100.0, 101.0, 102.0, 103.0]));
    let cfg = config(&[("INSTRUMENTS", "LATE")]);

    let err = run_pipeline(&provider, &provider, &cfg, end()).await.unwrap_err();

    assert!(matches!(err, PipelineError::Alignment { rows: 0, required: 3 }));
}

#[rstest]
#[tokio::test]
async fn csv_source_reads_saved_snapshots(market_prices: Vec<f64>) {
    let dir = tempfile::tempdir().unwrap();
    let store = CsvPriceStore::new(dir.path());
    store.write(&series("AAPL", &[10.0, 10.4, 10.1, 10.8, 11.0, 10.6, 11.2, 11.5, 11.3, 11.9])).unwrap();
    store.write(&series(MARKET, &market_prices)).unwrap();

    let dir_value = dir.path().to_string_lossy().to_string();
    let cfg = config(&[("INSTRUMENTS", "AAPL"), ("DATA_SOURCE", "csv"), ("CSV_DATA_DIR", &dir_value)]);

    let output = run_from_config(&cfg, end()).await.unwrap();

    assert_eq!(output.prices.columns(), &["AAPL", MARKET]);
    assert_eq!(output.report.returns.n_rows(), 9);
    assert!(output.report.performance.get("AAPL").unwrap().beta.is_ok());
}

#[tokio::test]
async fn synthetic_source_recovers_assigned_betas() {
    let cfg = config(&[("INSTRUMENTS", "AAPL,JPM"), ("DATA_SOURCE", "synthetic"), ("SYNTHETIC_SEED", "11")]);

    let output = run_from_config(&cfg, end()).await.unwrap();

    assert!(output.prices.n_rows() > 200);
    for record in output.report.performance.records() {
        let estimated = *record.beta.as_ref().unwrap();
        assert_relative_eq!(estimated, SyntheticProvider::beta_for(&record.symbol), epsilon = 0.5);
    }
    let cumulative_first = output.report.cumulative.columns.iter().map(|c| c.values.as_ref().unwrap()[0]);
    for value in cumulative_first {
        assert_relative_eq!(value, 0.0);
    }
}
