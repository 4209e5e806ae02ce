use chrono::NaiveDate;
use tracing::{info, instrument};

use crate::analytics::engine::run_analytics;
use crate::analytics::types::{AnalyticsReport, PriceTable};
use crate::config::{Config, DataSource};
use crate::error::PipelineError;
use crate::market_data::acquire::{fetch_price_table, PriceRequest};
use crate::market_data::csv_store::CsvPriceStore;
use crate::market_data::fred::FredClient;
use crate::market_data::synthetic::SyntheticProvider;
use crate::market_data::yahoo::YahooFinanceClient;
use crate::market_data::{DateRange, PriceProvider};

/// Result of one full run: the aligned prices and everything derived from them.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub prices: PriceTable,
    pub report: AnalyticsReport,
}

/// The price request implied by `config` for a horizon ending on `end`.
pub fn price_request(config: &Config, end: NaiveDate) -> PriceRequest {
    PriceRequest {
        instruments: config.instruments.clone(),
        market_symbol: config.market_index.symbol.clone(),
        range: DateRange::trailing_years(end, config.horizon_years),
    }
}

/// Acquire → align → analytics, with the given providers.
#[instrument(name = "pipeline", skip_all, fields(on_close = true, %end))]
pub async fn run_pipeline<E, I>(
    equities: &E,
    index: &I,
    config: &Config,
    end: NaiveDate,
) -> Result<PipelineOutput, PipelineError>
where
    E: PriceProvider,
    I: PriceProvider,
{
    info!(
        equities = equities.name(),
        index = index.name(),
        instruments = ?config.instruments,
        horizon_years = config.horizon_years,
        "Starting pipeline run"
    );

    let request = price_request(config, end);
    let prices = fetch_price_table(equities, index, &request).await?;
    let report = run_analytics(&prices, &config.market_index, &config.analysis);

    Ok(PipelineOutput { prices, report })
}

/// Runs the pipeline against the providers selected by `config.data_source`.
pub async fn run_from_config(config: &Config, end: NaiveDate) -> Result<PipelineOutput, PipelineError> {
    match config.data_source {
        DataSource::Live => {
            let yahoo = YahooFinanceClient::new(&config.yahoo_base_url, config.requests_per_second)
                .map_err(|source| PipelineError::ProviderSetup { provider: "yahoo", source })?;
            let fred = FredClient::new(&config.fred_base_url, config.requests_per_second)
                .map_err(|source| PipelineError::ProviderSetup { provider: "fred", source })?;
            run_pipeline(&yahoo, &fred, config, end).await
        }
        DataSource::Csv => {
            let store = CsvPriceStore::new(&config.csv_data_dir);
            run_pipeline(&store, &store, config, end).await
        }
        DataSource::Synthetic => {
            let provider = SyntheticProvider::new(config.synthetic_seed, &config.market_index.symbol);
            run_pipeline(&provider, &provider, config, end).await
        }
    }
}
