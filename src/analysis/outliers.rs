/// Z-score outlier filtering for the gauge reference records.
///
/// Dropping outliers changes the support of the gauge flow-duration curves
/// only. The series being corrected is never filtered.

use crate::model::{CorrectionError, FlowSeries};

/// Population z-scores of `values`. `None` when the spread is zero.
fn zscores(values: &[f64]) -> Option<Vec<f64>> {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std = variance.sqrt();
    if std == 0.0 || !std.is_finite() {
        return None;
    }
    Some(values.iter().map(|v| (v - mean) / std).collect())
}

/// Keeps the points of a NaN-free series whose `|z| < threshold`.
///
/// A series without spread has no outliers and is returned unchanged.
///
/// # Errors
/// - `InvalidConfiguration` - non-positive or non-finite threshold.
/// - `InvalidInput` - every point was an outlier.
pub fn drop_outliers(series: &FlowSeries, threshold: f64) -> Result<FlowSeries, CorrectionError> {
    if !threshold.is_finite() || threshold <= 0.0 {
        return Err(CorrectionError::InvalidConfiguration(format!(
            "outlier z-score threshold must be positive, got {}",
            threshold
        )));
    }
    if series.is_empty() {
        return Ok(series.clone());
    }

    let values = series.values();
    let Some(scores) = zscores(&values) else {
        return Ok(series.clone());
    };

    let kept: Vec<_> = series
        .points()
        .iter()
        .zip(scores)
        .filter(|(_, z)| z.abs() < threshold)
        .map(|(p, _)| *p)
        .collect();

    let dropped = series.len() - kept.len();
    if dropped > 0 {
        tracing::debug!(dropped, threshold, "dropped outliers from reference series");
    }
    if kept.is_empty() {
        return Err(CorrectionError::InvalidInput(format!(
            "every point exceeded the outlier threshold {}",
            threshold
        )));
    }

    FlowSeries::new(kept)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
