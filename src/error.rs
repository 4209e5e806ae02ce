use chrono::NaiveDate;
use thiserror::Error;

/// A metric that cannot be computed for one column or instrument.
///
/// These never abort a run: the affected cell is reported as unavailable and
/// every other instrument is still computed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MetricError {
    #[error("first price is zero, series cannot be rebased")]
    ZeroFirstPrice,
    #[error("zero price on {date}, return for the following day is undefined")]
    ZeroPrice { date: NaiveDate },
    #[error("return on {date} is not finite, previous price is too small")]
    NonFiniteReturn { date: NaiveDate },
    #[error("{statistic} is not finite")]
    NonFiniteStatistic { statistic: &'static str },
    #[error("need at least {required} observations, got {actual}")]
    InsufficientObservations { required: usize, actual: usize },
    #[error("market returns have zero variance, beta is undefined")]
    ZeroMarketVariance,
    #[error("returns have zero volatility, Sharpe ratio is undefined")]
    ZeroVolatility,
    #[error("series lengths differ: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },
}

/// Failures raised by a price provider for a single symbol.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest_middleware::Error),
    #[error("http response error: {0}")]
    Response(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("provider returned no prices")]
    EmptySeries,
    #[error("non-finite price on {date}")]
    NonFinitePrice { date: NaiveDate },
    #[error("duplicate observation for {date}")]
    DuplicateDate { date: NaiveDate },
    #[error("unknown symbol")]
    UnknownSymbol,
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Errors that abort a whole pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to acquire prices for {symbol}: {source}")]
    DataAcquisition {
        symbol: String,
        #[source]
        source: ProviderError,
    },
    #[error("aligned price history has {rows} rows, at least {required} are required")]
    Alignment { rows: usize, required: usize },
    #[error("failed to set up {provider} provider: {source}")]
    ProviderSetup {
        provider: &'static str,
        #[source]
        source: ProviderError,
    },
}

impl PipelineError {
    pub fn acquisition(symbol: impl Into<String>, source: ProviderError) -> Self {
        PipelineError::DataAcquisition {
            symbol: symbol.into(),
            source,
        }
    }
}
