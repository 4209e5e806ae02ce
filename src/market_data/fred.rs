use chrono::NaiveDate;
use reqwest_middleware::ClientWithMiddleware;
use tracing::{debug, instrument};
use url::Url;

use super::http::build_http_client;
use super::{DateRange, PriceProvider};
use crate::analytics::types::PriceSeries;
use crate::error::ProviderError;

pub const FRED_BASE_URL: &str = "https://fred.stlouisfed.org";

/// FRED marks days without an observation (market holidays) with ".".
const MISSING_VALUE: &str = ".";

/// Market index levels from the FRED graph CSV download.
#[derive(Debug, Clone)]
pub struct FredClient {
    http_client: ClientWithMiddleware,
    base_url: String,
}

impl FredClient {
    pub fn new(base_url: impl Into<String>, requests_per_second: u32) -> Result<Self, ProviderError> {
        Ok(Self {
            http_client: build_http_client(requests_per_second)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn series_url(&self, series_id: &str, range: &DateRange) -> Result<Url, ProviderError> {
        let mut url = Url::parse(&format!("{}/graph/fredgraph.csv", self.base_url))?;
        url.query_pairs_mut()
            .append_pair("id", series_id)
            .append_pair("cosd", &range.start.format("%Y-%m-%d").to_string())
            .append_pair("coed", &range.end.format("%Y-%m-%d").to_string());
        Ok(url)
    }
}

impl PriceProvider for FredClient {
    fn name(&self) -> &str {
        "fred"
    }

    #[instrument(skip(self), fields(on_close = true))]
    async fn fetch_close_prices(&self, symbol: &str, range: &DateRange) -> Result<PriceSeries, ProviderError> {
        let url = self.series_url(symbol, range)?;
        let body = self.http_client.get(url).send().await?.error_for_status()?.text().await?;

        let observations = parse_fred_csv(&body)?;
        debug!(series = symbol, observations = observations.len(), "Received series from FRED");

        let series = PriceSeries::new(symbol, observations)?;
        Ok(series.within(range.start, range.end))
    }
}

/// Parses `date,value` rows, skipping the header and missing observations.
pub fn parse_fred_csv(body: &str) -> Result<Vec<(NaiveDate, f64)>, ProviderError> {
    let mut reader = csv::Reader::from_reader(body.as_bytes());
    let mut observations = Vec::new();

    for record in reader.records() {
        let record = record?;
        let (Some(raw_date), Some(raw_value)) = (record.get(0), record.get(1)) else {
            return Err(ProviderError::Malformed(format!("expected 2 columns, got {}", record.len())));
        };
        let raw_value = raw_value.trim();
        if raw_value.is_empty() || raw_value == MISSING_VALUE {
            continue;
        }

        let date = NaiveDate::parse_from_str(raw_date.trim(), "%Y-%m-%d")
            .map_err(|e| ProviderError::Malformed(format!("bad date {raw_date:?}: {e}")))?;
        let value: f64 = raw_value
            .parse()
            .map_err(|e| ProviderError::Malformed(format!("bad value {raw_value:?} on {date}: {e}")))?;
        observations.push((date, value));
    }

    Ok(observations)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_missing_observations() {
        let body = "observation_date,SP500\n2024-01-12,4783.83\n2024-01-15,.\n2024-01-16,4765.98\n";
        let observations = parse_fred_csv(body).unwrap();
        assert_eq!(observations.len(), 2);
        assert_eq!(observations[1], (NaiveDate::from_ymd_opt(2024, 1, 16).unwrap(), 4765.98));
    }

    #[test]
    fn rejects_garbage_values() {
        let body = "DATE,SP500\n2024-01-12,abc\n";
        assert!(matches!(parse_fred_csv(body), Err(ProviderError::Malformed(_))));
    }
}
