/// Gumbel Type I tail correction.
///
/// After scalar correction the mid-range of a series is trusted; the tails
/// are where sparse gauge support makes the scalars least reliable. The
/// tail correction fits a Gumbel Type I distribution to the trusted band
/// (method of moments with the usual regression constants) and replaces
/// every value outside the band with the Gumbel quantile at the return
/// period implied by its self-percentile.

use crate::analysis::scalar_bias::validate_range;
use crate::model::{CorrectionError, GumbelFit};

/// Upper clamp for percentiles so the return period stays finite.
pub const MAX_PERCENTILE: f64 = 99.999;
/// Lower clamp for percentiles so `ln(0)` is never taken.
pub const MIN_PERCENTILE: f64 = 0.001;

/// Gumbel Type I flow for return period `rp` (years).
///
/// `Q = −ln(−ln(1 − 1/rp)) · 0.7797·σ + x̄ − 0.45·σ`
pub fn solve_gumbel_flow(std: f64, xbar: f64, rp: f64) -> f64 {
    -(-(1.0 - 1.0 / rp).ln()).ln() * std * 0.7797 + xbar - 0.45 * std
}

/// Return period for a non-exceedance percentile, clamped to stay finite.
pub fn return_period(percentile: f64) -> f64 {
    let p = percentile.clamp(MIN_PERCENTILE, MAX_PERCENTILE);
    1.0 / (1.0 - p / 100.0)
}

/// Fits `(x̄, σ)` on the values whose percentile lies strictly inside
/// `(low, high)` and replaces the others with Gumbel quantiles.
///
/// `values` and `percentiles` are aligned. Returns the fit, or `None`
/// when every value was already trusted and nothing changed.
///
/// # Errors
/// - `InvalidConfiguration` - malformed trusted range or misaligned inputs.
/// - `DegenerateDistribution` - fewer than two trusted values while some
///   value needs replacing.
pub fn correct_tails(
    values: &mut [f64],
    percentiles: &[f64],
    trusted: (f64, f64),
) -> Result<Option<GumbelFit>, CorrectionError> {
    let (low, high) = trusted;
    validate_range("gumbel trusted", low, high)?;
    if values.len() != percentiles.len() {
        return Err(CorrectionError::InvalidConfiguration(format!(
            "{} values but {} percentiles",
            values.len(),
            percentiles.len()
        )));
    }

    let is_trusted = |p: f64| p > low && p < high;

    if percentiles.iter().all(|&p| is_trusted(p)) {
        return Ok(None);
    }

    let sample: Vec<f64> = values
        .iter()
        .zip(percentiles)
        .filter(|(_, p)| is_trusted(**p))
        .map(|(v, _)| *v)
        .collect();

    if sample.len() < 2 {
        return Err(CorrectionError::DegenerateDistribution(format!(
            "gumbel fit needs at least two values inside ({}, {}), found {}",
            low,
            high,
            sample.len()
        )));
    }

    let n = sample.len() as f64;
    let xbar = sample.iter().sum::<f64>() / n;
    let std = (sample.iter().map(|v| (v - xbar).powi(2)).sum::<f64>() / (n - 1.0)).sqrt();

    for (value, &p) in values.iter_mut().zip(percentiles) {
        if !is_trusted(p) {
            *value = solve_gumbel_flow(std, xbar, return_period(p));
        }
    }

    Ok(Some(GumbelFit { xbar, std }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
