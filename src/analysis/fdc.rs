/// Flow-duration curve construction.
///
/// A flow-duration curve (FDC) maps a probability to the empirical flow
/// quantile of a record. The curve is evaluated on a fixed grid of
/// `steps + 1` evenly spaced percentiles from 0 to 100.
///
/// # Exceedance convention
///
/// With `exceedance = true` the percentile column is reported as
/// exceedance probability by reversing the *labels only*. The flow at
/// position `i` is always the quantile at the `i`-th increasing
/// percentile, so position 0 holds the minimum flow labelled 100 (always
/// exceeded) and the last position holds the maximum flow labelled 0.

use serde::Serialize;

use crate::model::CorrectionError;

/// Default resolution of the percentile grid.
pub const DEFAULT_PROB_STEPS: usize = 500;

/// One `(percentile, flow)` point of a flow-duration curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FdcPoint {
    pub percentile: f64,
    pub flow: f64,
}

/// An empirical flow-duration curve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowDurationCurve {
    pub exceedance: bool,
    pub points: Vec<FdcPoint>,
}

impl FlowDurationCurve {
    pub fn percentiles(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.percentile).collect()
    }

    pub fn flows(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.flow).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Column header used when the curve is exported.
    pub fn probability_label(&self) -> &'static str {
        if self.exceedance {
            "Exceedence Probability"
        } else {
            "Non-Exceedence Probability"
        }
    }
}

/// The percentile cut-points `0, 100/steps, ..., 100`, rounded to five
/// decimals so that grids built independently compare equal.
pub fn percentile_grid(steps: usize) -> Vec<f64> {
    (0..=steps)
        .map(|i| round_to(100.0 * i as f64 / steps as f64, 5))
        .collect()
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Linear ("R-7") quantile of pre-sorted data at percentile `p` in [0, 100].
///
/// The caller guarantees `sorted` is non-empty, NaN-free and sorted in
/// non-decreasing order.
pub(crate) fn quantile_sorted(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let h = (n - 1) as f64 * (p / 100.0);
    let j = h.floor() as usize;
    let g = h - h.floor();
    if j + 1 >= n {
        sorted[n - 1]
    } else {
        (1.0 - g) * sorted[j] + g * sorted[j + 1]
    }
}

/// Sorted copy of the finite values in `values`.
pub(crate) fn sorted_finite(values: &[f64]) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

/// Builds the flow-duration curve of `values`.
///
/// Missing values (`NaN`) are ignored. Returns `steps + 1` points.
///
/// # Errors
/// - `InvalidConfiguration` - `steps` is zero.
/// - `InvalidInput` - no finite values remain.
pub fn flow_duration_curve(
    values: &[f64],
    steps: usize,
    exceedance: bool,
) -> Result<FlowDurationCurve, CorrectionError> {
    if steps == 0 {
        return Err(CorrectionError::InvalidConfiguration(
            "flow-duration curve needs at least one probability step".to_string(),
        ));
    }

    let sorted = sorted_finite(values);
    if sorted.is_empty() {
        return Err(CorrectionError::InvalidInput(
            "cannot build a flow-duration curve from an empty series".to_string(),
        ));
    }

    let mut percentiles = percentile_grid(steps);
    let flows: Vec<f64> = percentiles
        .iter()
        .map(|&p| quantile_sorted(&sorted, p))
        .collect();

    if exceedance {
        percentiles.reverse();
    }

    let points = percentiles
        .into_iter()
        .zip(flows)
        .map(|(percentile, flow)| FdcPoint { percentile, flow })
        .collect();

    Ok(FlowDurationCurve { exceedance, points })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
