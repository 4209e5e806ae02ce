use super::stats::mean;
use super::types::Metric;
use crate::error::MetricError;

/// Annualized market return: mean daily return times trading days.
pub fn market_annual_return(market_returns: &[f64], trading_days_per_year: u32) -> Metric {
    let annual = mean(market_returns)? * f64::from(trading_days_per_year);
    if !annual.is_finite() {
        return Err(MetricError::NonFiniteStatistic { statistic: "market return" });
    }
    Ok(annual)
}

/// CAPM: `rf + beta * (market_return - rf)`. All rates in the same unit.
pub fn expected_return(risk_free_rate: f64, beta: f64, market_return: f64) -> f64 {
    risk_free_rate + beta * (market_return - risk_free_rate)
}

/// CAPM over possibly unavailable inputs; the first missing input's reason
/// becomes the reason for the result.
pub fn capm_expected_return(risk_free_rate: f64, beta: &Metric, market_return: &Metric) -> Metric {
    let beta = beta.clone()?;
    let market_return = market_return.clone()?;
    Ok(expected_return(risk_free_rate, beta, market_return))
}
