/// Scalar-bias flow-duration curves.
///
/// The scalar-bias curve is the position-wise ratio of two flow-duration
/// curves built on the same percentile grid. With the observed gauge record
/// as the numerator and the simulated record as the denominator, each
/// scalar is the multiplicative correction that moves a simulated flow at
/// that percentile onto the observed distribution.

use serde::Serialize;

use crate::analysis::fdc::flow_duration_curve;
use crate::model::CorrectionError;

/// One `(percentile, scalar)` point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScalarPoint {
    pub percentile: f64,
    pub scalar: f64,
}

/// Ratio of two flow-duration curves, finite scalars only.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ScalarBiasCurve {
    pub points: Vec<ScalarPoint>,
}

impl ScalarBiasCurve {
    pub fn percentiles(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.percentile).collect()
    }

    pub fn scalars(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.scalar).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Keeps points whose percentile lies in `[low, high]` (inclusive).
    ///
    /// Used to discard the badly supported tails of the curve before
    /// building the interpolator.
    pub fn filter_range(&self, low: f64, high: f64) -> Result<ScalarBiasCurve, CorrectionError> {
        validate_range("scalar curve filter", low, high)?;
        Ok(ScalarBiasCurve {
            points: self
                .points
                .iter()
                .filter(|p| p.percentile >= low && p.percentile <= high)
                .copied()
                .collect(),
        })
    }

    pub fn mean(&self) -> Option<f64> {
        if self.points.is_empty() {
            return None;
        }
        Some(self.points.iter().map(|p| p.scalar).sum::<f64>() / self.points.len() as f64)
    }

    pub fn min(&self) -> Option<f64> {
        self.points.iter().map(|p| p.scalar).reduce(f64::min)
    }

    pub fn max(&self) -> Option<f64> {
        self.points.iter().map(|p| p.scalar).reduce(f64::max)
    }
}

/// Checks that a percentile band is well formed.
pub(crate) fn validate_range(what: &str, low: f64, high: f64) -> Result<(), CorrectionError> {
    if !low.is_finite() || !high.is_finite() || low >= high {
        return Err(CorrectionError::InvalidConfiguration(format!(
            "{} range ({}, {}) must satisfy low < high",
            what, low, high
        )));
    }
    Ok(())
}

/// Builds the scalar-bias curve `reference_a / reference_b`.
///
/// Both inputs are converted to flow-duration curves with the same grid
/// and convention; the percentile labels come from `reference_a`'s curve.
/// Ratios that are infinite or NaN (zero denominators) are dropped, so the
/// result may be shorter than `steps + 1` and may even be empty.
///
/// # Errors
/// Propagates `flow_duration_curve` errors for either input.
pub fn scalar_bias_curve(
    reference_a: &[f64],
    reference_b: &[f64],
    steps: usize,
    exceedance: bool,
) -> Result<ScalarBiasCurve, CorrectionError> {
    let fdc_a = flow_duration_curve(reference_a, steps, exceedance)?;
    let fdc_b = flow_duration_curve(reference_b, steps, exceedance)?;

    let points = fdc_a
        .points
        .iter()
        .zip(fdc_b.points.iter())
        .map(|(a, b)| ScalarPoint {
            percentile: a.percentile,
            scalar: a.flow / b.flow,
        })
        .filter(|p| p.scalar.is_finite())
        .collect();

    Ok(ScalarBiasCurve { points })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
