use chrono::Local;
use dotenvy::dotenv;
use eyre::WrapErr;
use tracing::{info, instrument, warn};

use capm_dashboard::config::Config;
use capm_dashboard::logging;
use capm_dashboard::market_data::csv_store::CsvPriceStore;
use capm_dashboard::market_data::fred::FredClient;
use capm_dashboard::market_data::yahoo::YahooFinanceClient;
use capm_dashboard::market_data::{DateRange, PriceProvider};

// Saves live price history so later runs can use DATA_SOURCE=csv
#[instrument(name = "price_snapshot_main")]
#[tokio::main]
async fn main() -> eyre::Result<()> {
    dotenv().ok();

    if let Err(e) = logging::init_logging(env!("CARGO_BIN_NAME")) {
        eprintln!("Failed to initialize logging: {}", e);
        return Err(e);
    }

    let cfg = Config::load()?;
    let range = DateRange::trailing_years(Local::now().date_naive(), cfg.horizon_years);
    let store = CsvPriceStore::new(&cfg.csv_data_dir);
    info!(dir = %store.dir().display(), start = %range.start, end = %range.end, "Saving price snapshot");

    let yahoo = YahooFinanceClient::new(&cfg.yahoo_base_url, cfg.requests_per_second)?;
    let fred = FredClient::new(&cfg.fred_base_url, cfg.requests_per_second)?;

    for symbol in &cfg.instruments {
        save(&yahoo, &store, symbol, &range).await?;
    }
    save(&fred, &store, &cfg.market_index.symbol, &range).await?;

    Ok(())
}

// Empty histories are skipped so a stale but valid snapshot is kept
async fn save(provider: &impl PriceProvider, store: &CsvPriceStore, symbol: &str, range: &DateRange) -> eyre::Result<()> {
    let series = provider
        .fetch_close_prices(symbol, range)
        .await
        .wrap_err_with(|| format!("Failed to fetch {symbol}"))?;
    if series.is_empty() {
        warn!(symbol = %symbol, provider = provider.name(), "No prices returned, nothing saved");
        return Ok(());
    }
    let path = store.write(&series)?;
    info!(symbol = %symbol, observations = series.len(), path = %path.display(), "Saved");
    Ok(())
}
