use crate::error::MetricError;

/// Variances at or below this are treated as zero.
pub const DEGENERATE_VARIANCE: f64 = 1e-20;

/// Annualized volatilities at or below this are treated as zero.
pub const DEGENERATE_VOLATILITY: f64 = 1e-10;

pub fn mean(values: &[f64]) -> Result<f64, MetricError> {
    if values.is_empty() {
        return Err(MetricError::InsufficientObservations {
            required: 1,
            actual: 0,
        });
    }
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample covariance (divides by n - 1).
pub fn sample_covariance(xs: &[f64], ys: &[f64]) -> Result<f64, MetricError> {
    if xs.len() != ys.len() {
        return Err(MetricError::LengthMismatch {
            left: xs.len(),
            right: ys.len(),
        });
    }
    if xs.len() < 2 {
        return Err(MetricError::InsufficientObservations {
            required: 2,
            actual: xs.len(),
        });
    }

    let n = xs.len() as f64;
    let mean_x = mean(xs)?;
    let mean_y = mean(ys)?;

    let covariance = xs
        .iter()
        .zip(ys.iter())
        .map(|(x, y)| (x - mean_x) * (y - mean_y))
        .sum::<f64>()
        / (n - 1.0);

    Ok(covariance)
}

/// Sample variance, computed through `sample_covariance` so that
/// `cov(x, x) == var(x)` holds bit for bit.
pub fn sample_variance(values: &[f64]) -> Result<f64, MetricError> {
    sample_covariance(values, values)
}

pub fn sample_std(values: &[f64]) -> Result<f64, MetricError> {
    Ok(sample_variance(values)?.sqrt())
}
