/// Percentile-of-score ranking.
///
/// Each point of the series being corrected is classified by its rank
/// within *that same series*, not within the gauge record. The correction
/// therefore propagates relative position in the flow distribution rather
/// than absolute magnitude.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::CorrectionError;

/// How ties are counted when ranking a value within a reference set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PercentileKind {
    /// Average of `Strict` and `Weak`: ties count as half.
    #[default]
    Mean,
    /// Share of reference values strictly below the score.
    Strict,
    /// Share of reference values at or below the score.
    Weak,
    /// Average rank of the tied block, including the score itself.
    Rank,
}

impl PercentileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PercentileKind::Mean => "mean",
            PercentileKind::Strict => "strict",
            PercentileKind::Weak => "weak",
            PercentileKind::Rank => "rank",
        }
    }
}

impl FromStr for PercentileKind {
    type Err = CorrectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mean" => Ok(PercentileKind::Mean),
            "strict" => Ok(PercentileKind::Strict),
            "weak" => Ok(PercentileKind::Weak),
            "rank" => Ok(PercentileKind::Rank),
            other => Err(CorrectionError::InvalidConfiguration(format!(
                "unknown percentile kind '{}' (expected mean, strict, weak or rank)",
                other
            ))),
        }
    }
}

impl TryFrom<String> for PercentileKind {
    type Error = CorrectionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PercentileKind> for String {
    fn from(kind: PercentileKind) -> Self {
        kind.as_str().to_string()
    }
}

/// Percentile rank of `score` within pre-sorted, NaN-free `sorted`.
fn rank_in_sorted(sorted: &[f64], score: f64, kind: PercentileKind) -> f64 {
    let n = sorted.len() as f64;
    let left = sorted.partition_point(|&v| v < score) as f64;
    let right = sorted.partition_point(|&v| v <= score) as f64;

    match kind {
        PercentileKind::Strict => left / n * 100.0,
        PercentileKind::Weak => right / n * 100.0,
        PercentileKind::Mean => (left + right) / 2.0 / n * 100.0,
        PercentileKind::Rank => {
            let plus_one = if right > left { 1.0 } else { 0.0 };
            (left + right + plus_one) * (50.0 / n)
        }
    }
}

/// Percentile rank (0–100) of `score` within `reference`.
///
/// Missing values in `reference` are ignored.
///
/// # Errors
/// `InvalidInput` when `reference` has no finite values or `score` is NaN.
pub fn percentile_of_score(
    reference: &[f64],
    score: f64,
    kind: PercentileKind,
) -> Result<f64, CorrectionError> {
    if score.is_nan() {
        return Err(CorrectionError::InvalidInput(
            "cannot rank a missing value".to_string(),
        ));
    }
    let sorted = crate::analysis::fdc::sorted_finite(reference);
    if sorted.is_empty() {
        return Err(CorrectionError::InvalidInput(
            "cannot rank against an empty reference".to_string(),
        ));
    }
    Ok(rank_in_sorted(&sorted, score, kind))
}

/// Self-percentile of every value: its rank within `values` itself.
///
/// The reference is sorted once, so this is `O(n log n)` rather than the
/// quadratic per-point scan.
///
/// # Errors
/// `InvalidInput` when `values` is empty or contains missing values.
pub fn self_percentiles(values: &[f64], kind: PercentileKind) -> Result<Vec<f64>, CorrectionError> {
    if values.is_empty() {
        return Err(CorrectionError::InvalidInput(
            "cannot rank an empty series".to_string(),
        ));
    }
    if values.iter().any(|v| v.is_nan()) {
        return Err(CorrectionError::InvalidInput(
            "drop missing values before ranking".to_string(),
        ));
    }

    let sorted = crate::analysis::fdc::sorted_finite(values);
    Ok(values
        .iter()
        .map(|&v| rank_in_sorted(&sorted, v, kind))
        .collect())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
