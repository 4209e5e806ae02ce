use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

use super::{DateRange, PriceProvider};
use crate::analytics::types::PriceSeries;
use crate::error::ProviderError;

#[derive(Debug, Serialize, Deserialize)]
struct PriceRow {
    date: NaiveDate,
    close: f64,
}

/// Directory of `{SYMBOL}.csv` files with `date,close` rows.
#[derive(Debug, Clone)]
pub struct CsvPriceStore {
    dir: PathBuf,
}

impl CsvPriceStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}.csv"))
    }

    /// Reads the full stored history for `symbol`.
    pub fn read(&self, symbol: &str) -> Result<PriceSeries, ProviderError> {
        let path = self.path_for(symbol);
        if !path.exists() {
            return Err(ProviderError::UnknownSymbol);
        }

        let mut reader = csv::Reader::from_path(&path)?;
        let observations = reader
            .deserialize::<PriceRow>()
            .map(|row| row.map(|r| (r.date, r.close)))
            .collect::<Result<Vec<_>, csv::Error>>()?;
        debug!(symbol, path = %path.display(), rows = observations.len(), "Read price file");

        PriceSeries::new(symbol, observations)
    }

    /// Writes `series`, replacing any stored history for its symbol. An empty
    /// series is refused and leaves any existing file untouched.
    #[instrument(skip(self, series), fields(symbol = series.symbol()))]
    pub fn write(&self, series: &PriceSeries) -> Result<PathBuf, ProviderError> {
        if series.is_empty() {
            return Err(ProviderError::EmptySeries);
        }
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(series.symbol());

        let mut writer = csv::Writer::from_path(&path)?;
        for (date, close) in series.observations() {
            writer.serialize(PriceRow { date, close })?;
        }
        writer.flush()?;

        info!(path = %path.display(), rows = series.len(), "Price file written");
        Ok(path)
    }
}

impl PriceProvider for CsvPriceStore {
    fn name(&self) -> &str {
        "csv"
    }

    async fn fetch_close_prices(&self, symbol: &str, range: &DateRange) -> Result<PriceSeries, ProviderError> {
        Ok(self.read(symbol)?.within(range.start, range.end))
    }
}
