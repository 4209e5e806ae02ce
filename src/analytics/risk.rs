use super::stats::{mean, sample_std, DEGENERATE_VOLATILITY};
use super::types::Metric;
use crate::error::MetricError;

/// Sample standard deviation of daily returns scaled by `sqrt(trading days)`.
pub fn annualized_volatility(returns: &[f64], trading_days_per_year: u32) -> Metric {
    let volatility = sample_std(returns)? * f64::from(trading_days_per_year).sqrt();
    if !volatility.is_finite() {
        return Err(MetricError::NonFiniteStatistic { statistic: "volatility" });
    }
    Ok(volatility)
}

/// `(mean * trading_days - rf) / annualized_volatility`, with `rf` an annual
/// fraction. Flat returns have no defined Sharpe ratio.
pub fn sharpe_ratio(returns: &[f64], risk_free_fraction: f64, trading_days_per_year: u32) -> Metric {
    let volatility = annualized_volatility(returns, trading_days_per_year)?;
    if volatility <= DEGENERATE_VOLATILITY {
        return Err(MetricError::ZeroVolatility);
    }
    let annual_return = mean(returns)? * f64::from(trading_days_per_year);
    let sharpe = (annual_return - risk_free_fraction) / volatility;
    if !sharpe.is_finite() {
        return Err(MetricError::NonFiniteStatistic { statistic: "Sharpe ratio" });
    }
    Ok(sharpe)
}
