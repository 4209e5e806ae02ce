use chrono::{DateTime, Days, NaiveDate, NaiveTime};
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use super::http::build_http_client;
use super::{DateRange, PriceProvider};
use crate::analytics::types::PriceSeries;
use crate::error::ProviderError;

pub const YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";

/// Daily equity closes from the Yahoo Finance chart endpoint.
#[derive(Debug, Clone)]
pub struct YahooFinanceClient {
    http_client: ClientWithMiddleware,
    base_url: String,
}

impl YahooFinanceClient {
    pub fn new(base_url: impl Into<String>, requests_per_second: u32) -> Result<Self, ProviderError> {
        Ok(Self {
            http_client: build_http_client(requests_per_second)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn chart_url(&self, symbol: &str, range: &DateRange) -> Result<Url, ProviderError> {
        let period1 = unix_midnight(range.start);
        // period2 is exclusive
        let period2 = unix_midnight(range.end.checked_add_days(Days::new(1)).unwrap_or(range.end));
        let mut url = Url::parse(&format!("{}/v8/finance/chart/{}", self.base_url, symbol))?;
        url.query_pairs_mut()
            .append_pair("period1", &period1.to_string())
            .append_pair("period2", &period2.to_string())
            .append_pair("interval", "1d")
            .append_pair("includeAdjustedClose", "true");
        Ok(url)
    }
}

impl PriceProvider for YahooFinanceClient {
    fn name(&self) -> &str {
        "yahoo"
    }

    #[instrument(skip(self), fields(on_close = true))]
    async fn fetch_close_prices(&self, symbol: &str, range: &DateRange) -> Result<PriceSeries, ProviderError> {
        let url = self.chart_url(symbol, range)?;
        let response = self.http_client.get(url).send().await?.error_for_status()?;
        let chart: ChartResponse = response.json().await?;

        let observations = chart.into_observations()?;
        debug!(symbol, observations = observations.len(), "Received chart from Yahoo");

        let series = PriceSeries::new(symbol, observations)?;
        Ok(series.within(range.start, range.end))
    }
}

fn unix_midnight(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}

// Yahoo chart API response structures

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
    #[serde(default)]
    adjclose: Vec<AdjClose>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjClose {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

impl ChartResponse {
    /// Pairs timestamps with adjusted closes (plain closes when no adjusted
    /// series is present). Days with a null close are skipped.
    fn into_observations(self) -> Result<Vec<(NaiveDate, f64)>, ProviderError> {
        if let Some(error) = self.chart.error {
            return Err(ProviderError::Malformed(format!("{}: {}", error.code, error.description)));
        }
        let result = self
            .chart
            .result
            .and_then(|results| results.into_iter().next())
            .ok_or(ProviderError::EmptySeries)?;

        let closes = match result.indicators.adjclose.into_iter().next() {
            Some(adjusted) if !adjusted.adjclose.is_empty() => adjusted.adjclose,
            _ => result
                .indicators
                .quote
                .into_iter()
                .next()
                .map(|quote| quote.close)
                .unwrap_or_default(),
        };

        if closes.len() != result.timestamp.len() {
            return Err(ProviderError::Malformed(format!(
                "{} timestamps but {} closes",
                result.timestamp.len(),
                closes.len()
            )));
        }

        result
            .timestamp
            .iter()
            .zip(closes)
            .filter_map(|(ts, close)| close.map(|c| (*ts, c)))
            .map(|(ts, close)| {
                DateTime::from_timestamp(ts, 0)
                    .map(|dt| (dt.date_naive(), close))
                    .ok_or_else(|| ProviderError::Malformed(format!("invalid timestamp {ts}")))
            })
            .collect()
    }
}
