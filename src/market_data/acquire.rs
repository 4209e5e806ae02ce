use futures::future::try_join_all;
use tracing::{debug, info, instrument};

use super::{DateRange, PriceProvider};
use crate::analytics::types::{PriceSeries, PriceTable};
use crate::error::{PipelineError, ProviderError};

/// Three aligned prices give two returns, the fewest a standard deviation
/// can be computed from.
pub const MIN_ALIGNED_ROWS: usize = 3;

/// What to fetch for one pipeline run.
#[derive(Debug, Clone)]
pub struct PriceRequest {
    pub instruments: Vec<String>,
    pub market_symbol: String,
    pub range: DateRange,
}

/// Fetches every instrument and the market index, then inner-joins them on
/// date. Any provider failure or empty series aborts the run and names the
/// symbol; a join shorter than `MIN_ALIGNED_ROWS` is an alignment error.
#[instrument(
    name = "acquire_prices",
    skip_all,
    fields(on_close = true, instruments = request.instruments.len(), start = %request.range.start, end = %request.range.end)
)]
pub async fn fetch_price_table<E, I>(
    equities: &E,
    index: &I,
    request: &PriceRequest,
) -> Result<PriceTable, PipelineError>
where
    E: PriceProvider,
    I: PriceProvider,
{
    let fetches = request
        .instruments
        .iter()
        .map(|symbol| fetch_series(equities, symbol, &request.range));
    let instruments = try_join_all(fetches).await?;
    let market = fetch_series(index, &request.market_symbol, &request.range).await?;

    let table = PriceTable::inner_join(&instruments, &market);
    if table.n_rows() < MIN_ALIGNED_ROWS {
        return Err(PipelineError::Alignment {
            rows: table.n_rows(),
            required: MIN_ALIGNED_ROWS,
        });
    }

    info!(
        rows = table.n_rows(),
        first = ?table.dates().first(),
        last = ?table.dates().last(),
        "Price table aligned"
    );
    Ok(table)
}

async fn fetch_series<P: PriceProvider>(
    provider: &P,
    symbol: &str,
    range: &DateRange,
) -> Result<PriceSeries, PipelineError> {
    let series = provider
        .fetch_close_prices(symbol, range)
        .await
        .map_err(|e| PipelineError::acquisition(symbol, e))?;

    if series.is_empty() {
        return Err(PipelineError::acquisition(symbol, ProviderError::EmptySeries));
    }

    debug!(
        provider = provider.name(),
        symbol,
        observations = series.len(),
        "Fetched price series"
    );
    Ok(series)
}
