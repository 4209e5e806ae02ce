use super::stats::{mean, sample_covariance, sample_variance, DEGENERATE_VARIANCE};
use super::types::BetaAlpha;
use crate::error::MetricError;

/// Ordinary least squares fit of `instrument ~ market`.
///
/// Beta is `cov(market, instrument) / var(market)`; alpha is the daily
/// intercept `mean(instrument) - beta * mean(market)`. Both slices must hold
/// the same aligned dates.
pub fn estimate_beta_alpha(instrument: &[f64], market: &[f64]) -> Result<BetaAlpha, MetricError> {
    if instrument.len() != market.len() {
        return Err(MetricError::LengthMismatch {
            left: instrument.len(),
            right: market.len(),
        });
    }

    let market_variance = sample_variance(market)?;
    if !market_variance.is_finite() {
        return Err(MetricError::NonFiniteStatistic { statistic: "market variance" });
    }
    if market_variance <= DEGENERATE_VARIANCE {
        return Err(MetricError::ZeroMarketVariance);
    }

    let covariance = sample_covariance(market, instrument)?;
    let beta = covariance / market_variance;
    let alpha = mean(instrument)? - beta * mean(market)?;
    if !beta.is_finite() || !alpha.is_finite() {
        return Err(MetricError::NonFiniteStatistic { statistic: "regression fit" });
    }

    Ok(BetaAlpha { beta, alpha })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    const MARKET: [f64; 8] = [0.01, -0.02, 0.015, 0.003, -0.007, 0.012, -0.001, 0.004];

    #[test]
    fn self_regression_is_identity() {
        let fit = estimate_beta_alpha(&MARKET, &MARKET).unwrap();
        assert_eq!(fit.beta, 1.0);
        assert_eq!(fit.alpha, 0.0);
    }

    #[rstest]
    #[case(1.5, 0.0)]
    #[case(0.5, 0.001)]
    #[case(-0.8, -0.0005)]
    fn recovers_exact_linear_relation(#[case] beta: f64, #[case] alpha: f64) {
        let instrument: Vec<f64> = MARKET.iter().map(|m| alpha + beta * m).collect();
        let fit = estimate_beta_alpha(&instrument, &MARKET).unwrap();
        assert_relative_eq!(fit.beta, beta, epsilon = 1e-12);
        assert_relative_eq!(fit.alpha, alpha, epsilon = 1e-12);
    }

    #[test]
    fn flat_market_is_degenerate() {
        let flat = [0.0; 8];
        assert_eq!(
            estimate_beta_alpha(&MARKET, &flat),
            Err(MetricError::ZeroMarketVariance)
        );
    }

    #[test]
    fn flat_instrument_has_zero_beta() {
        let fit = estimate_beta_alpha(&[0.0; 8], &MARKET).unwrap();
        assert_eq!(fit.beta, 0.0);
        assert_eq!(fit.alpha, 0.0);
    }

    #[rstest]
    #[case(f64::INFINITY)]
    #[case(f64::NAN)]
    fn non_finite_market_is_not_a_fit(#[case] bad: f64) {
        let mut market = MARKET;
        market[2] = bad;
        assert_eq!(
            estimate_beta_alpha(&MARKET, &market),
            Err(MetricError::NonFiniteStatistic { statistic: "market variance" })
        );
    }

    #[test]
    fn non_finite_instrument_is_not_a_fit() {
        let mut instrument = MARKET;
        instrument[1] = f64::INFINITY;
        assert_eq!(
            estimate_beta_alpha(&instrument, &MARKET),
            Err(MetricError::NonFiniteStatistic { statistic: "regression fit" })
        );
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        assert_eq!(
            estimate_beta_alpha(&MARKET[..3], &MARKET),
            Err(MetricError::LengthMismatch { left: 3, right: 8 })
        );
    }
}
