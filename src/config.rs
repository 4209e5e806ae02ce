use dotenvy::dotenv;
use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

use crate::analytics::types::{AnalysisSettings, MarketIndex, RiskFreeRate};
use crate::market_data::fred::FRED_BASE_URL;
use crate::market_data::yahoo::YAHOO_BASE_URL;

const DEFAULT_INSTRUMENTS: &str = "AAPL,TSLA,AMZN,GOOGL";
const MAX_HORIZON_YEARS: u32 = 10;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{key} is invalid ({value:?}): {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Where price history comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    /// Yahoo Finance for equities, FRED for the index
    Live,
    /// CSV files previously written by `price_snapshot`
    Csv,
    /// Seeded random walks, no network
    Synthetic,
}

impl FromStr for DataSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "live" => Ok(DataSource::Live),
            "csv" => Ok(DataSource::Csv),
            "synthetic" => Ok(DataSource::Synthetic),
            other => Err(format!("unknown data source '{other}' (expected live, csv or synthetic)")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub instruments: Vec<String>,
    pub market_index: MarketIndex,
    pub horizon_years: u32,
    pub analysis: AnalysisSettings,
    pub data_source: DataSource,
    pub csv_data_dir: PathBuf,
    pub synthetic_seed: u64,
    pub output_dir: PathBuf,
    pub yahoo_base_url: String,
    pub fred_base_url: String,
    pub requests_per_second: u32,
}

impl Config {
    /// Loads `.env` (if present) and reads the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; unset keys take defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let instruments = parse_instruments(
            &lookup("INSTRUMENTS").unwrap_or_else(|| DEFAULT_INSTRUMENTS.to_string()),
        )?;

        let market_index = MarketIndex::new(
            lookup("MARKET_INDEX").unwrap_or_else(|| "SP500".to_string()),
            lookup("MARKET_INDEX_NAME").unwrap_or_else(|| "S&P 500".to_string()),
        );

        let horizon_years: u32 = parse_or(&lookup, "HORIZON_YEARS", 1)?;
        if !(1..=MAX_HORIZON_YEARS).contains(&horizon_years) {
            return Err(invalid(
                "HORIZON_YEARS",
                horizon_years,
                format!("must be between 1 and {MAX_HORIZON_YEARS}"),
            ));
        }

        let risk_free_percent: f64 = parse_or(&lookup, "RISK_FREE_RATE", 4.5)?;
        if !risk_free_percent.is_finite() {
            return Err(invalid("RISK_FREE_RATE", risk_free_percent, "must be finite"));
        }

        let trading_days_per_year: u32 = parse_or(&lookup, "TRADING_DAYS_PER_YEAR", 252)?;
        if trading_days_per_year < 1 {
            return Err(invalid("TRADING_DAYS_PER_YEAR", trading_days_per_year, "must be at least 1"));
        }

        let normalization_base: f64 = parse_or(&lookup, "NORMALIZATION_BASE", 1.0)?;
        if !(normalization_base.is_finite() && normalization_base > 0.0) {
            return Err(invalid("NORMALIZATION_BASE", normalization_base, "must be positive"));
        }

        let requests_per_second: u32 = parse_or(&lookup, "REQUESTS_PER_SECOND", 2)?;
        if requests_per_second < 1 {
            return Err(invalid("REQUESTS_PER_SECOND", requests_per_second, "must be at least 1"));
        }

        Ok(Config {
            instruments,
            market_index,
            horizon_years,
            analysis: AnalysisSettings {
                risk_free_rate: RiskFreeRate::from_percent(risk_free_percent),
                trading_days_per_year,
                normalization_base,
            },
            data_source: parse_or(&lookup, "DATA_SOURCE", DataSource::Live)?,
            csv_data_dir: PathBuf::from(lookup("CSV_DATA_DIR").unwrap_or_else(|| "data/prices".to_string())),
            synthetic_seed: parse_or(&lookup, "SYNTHETIC_SEED", 42)?,
            output_dir: PathBuf::from(lookup("OUTPUT_DIR").unwrap_or_else(|| "reports".to_string())),
            yahoo_base_url: lookup("YAHOO_BASE_URL").unwrap_or_else(|| YAHOO_BASE_URL.to_string()),
            fred_base_url: lookup("FRED_BASE_URL").unwrap_or_else(|| FRED_BASE_URL.to_string()),
            requests_per_second,
        })
    }
}

/// Comma-separated symbols, upper-cased, de-duplicated in first-seen order.
fn parse_instruments(raw: &str) -> Result<Vec<String>, ConfigError> {
    let mut symbols: Vec<String> = Vec::new();
    for symbol in raw.split(',').map(|s| s.trim().to_ascii_uppercase()) {
        if !symbol.is_empty() && !symbols.contains(&symbol) {
            symbols.push(symbol);
        }
    }
    if symbols.is_empty() {
        return Err(invalid("INSTRUMENTS", raw, "at least one symbol is required"));
    }
    Ok(symbols)
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| invalid(key, &raw, e)),
    }
}

fn invalid(key: &'static str, value: impl Display, reason: impl Display) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
