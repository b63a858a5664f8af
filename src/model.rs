/// Core data types for the bias-correction propagation library.
///
/// This module defines the shared domain model imported by all other
/// modules: the flow series that go in, the corrected series that comes
/// out, and the error type every stage reports through.

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Flow series
// ---------------------------------------------------------------------------

/// A single timestamped flow value. `NaN` marks a missing value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FlowPoint {
    pub timestamp: DateTime<Utc>,
    pub flow: f64,
}

/// An ordered, immutable flow record (simulated or observed).
///
/// Construction sorts the points chronologically and rejects anything that
/// cannot be a streamflow: duplicate timestamps, negative flows, and
/// infinities. Missing values (`NaN`) are kept so that the record stays
/// aligned with its source, and are dropped by `dropna` before any
/// statistic is computed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FlowSeries {
    points: Vec<FlowPoint>,
}

impl FlowSeries {
    pub fn new(mut points: Vec<FlowPoint>) -> Result<Self, CorrectionError> {
        points.sort_by_key(|p| p.timestamp);

        for window in points.windows(2) {
            if window[0].timestamp == window[1].timestamp {
                return Err(CorrectionError::InvalidInput(format!(
                    "duplicate timestamp {}",
                    window[0].timestamp.to_rfc3339()
                )));
            }
        }

        for point in &points {
            if point.flow.is_infinite() {
                return Err(CorrectionError::InvalidInput(format!(
                    "non-finite flow at {}",
                    point.timestamp.to_rfc3339()
                )));
            }
            if point.flow < 0.0 {
                return Err(CorrectionError::InvalidInput(format!(
                    "negative flow {} at {}",
                    point.flow,
                    point.timestamp.to_rfc3339()
                )));
            }
        }

        Ok(Self { points })
    }

    /// Convenience constructor from parallel timestamp/value vectors.
    pub fn from_pairs(
        timestamps: Vec<DateTime<Utc>>,
        flows: Vec<f64>,
    ) -> Result<Self, CorrectionError> {
        if timestamps.len() != flows.len() {
            return Err(CorrectionError::InvalidInput(format!(
                "{} timestamps but {} flow values",
                timestamps.len(),
                flows.len()
            )));
        }
        let points = timestamps
            .into_iter()
            .zip(flows)
            .map(|(timestamp, flow)| FlowPoint { timestamp, flow })
            .collect();
        Self::new(points)
    }

    pub fn points(&self) -> &[FlowPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Flow values in chronological order, missing values included.
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.flow).collect()
    }

    /// A copy of the series without missing values.
    pub fn dropna(&self) -> FlowSeries {
        FlowSeries {
            points: self
                .points
                .iter()
                .filter(|p| !p.flow.is_nan())
                .copied()
                .collect(),
        }
    }

    /// A copy restricted to points whose calendar month is in `months`.
    pub fn filter_months(&self, months: &[u32]) -> FlowSeries {
        FlowSeries {
            points: self
                .points
                .iter()
                .filter(|p| months.contains(&p.timestamp.month()))
                .copied()
                .collect(),
        }
    }

    /// Distinct calendar months present in the series, ascending.
    pub fn months(&self) -> Vec<u32> {
        let mut months: Vec<u32> = self.points.iter().map(|p| p.timestamp.month()).collect();
        months.sort_unstable();
        months.dedup();
        months
    }
}

// ---------------------------------------------------------------------------
// Corrected output
// ---------------------------------------------------------------------------

/// One row of the corrected series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CorrectedPoint {
    pub timestamp: DateTime<Utc>,
    pub corrected_flow: f64,
    /// Scalar applied to the simulated flow (obs/sim at the looked-up percentile).
    pub scalar: f64,
    /// Self-percentile of the simulated flow within its group.
    pub percentile: f64,
}

/// Gumbel Type I parameters fitted on the trusted mid-band of a group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GumbelFit {
    pub xbar: f64,
    pub std: f64,
}

/// Why a seasonal group was left out of the result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupDiagnostic {
    /// Human-readable group label, e.g. `"month 02"` or `"months 6,7,8"`.
    pub group: String,
    /// Serialized as its display message.
    #[serde(serialize_with = "serialize_error")]
    pub error: CorrectionError,
}

fn serialize_error<S: serde::Serializer>(error: &CorrectionError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

impl std::fmt::Display for GroupDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.group, self.error)
    }
}

/// Result of `propagate_correction`.
///
/// `points` is sorted chronologically and holds one row per target
/// timestamp of every group that was processed successfully.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CorrectedFlowSeries {
    pub points: Vec<CorrectedPoint>,
    /// Gumbel fit per group label, when tail correction ran.
    pub gumbel_fits: Vec<(String, GumbelFit)>,
    /// Groups skipped under seasonal decomposition.
    pub skipped: Vec<GroupDiagnostic>,
}

impl CorrectedFlowSeries {
    pub fn corrected_flows(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.corrected_flow).collect()
    }

    pub fn scalars(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.scalar).collect()
    }

    pub fn percentiles(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.percentile).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors raised by the correction pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum CorrectionError {
    /// A series is empty after cleaning, or contains values that cannot be flows.
    InvalidInput(String),
    /// Unknown policy token, malformed range, or inconsistent options.
    InvalidConfiguration(String),
    /// Not enough distinct support to build a curve or fit a distribution.
    DegenerateDistribution(String),
    /// Seasonal decomposition where every group failed.
    NoGroupSucceeded(Vec<GroupDiagnostic>),
    /// A parallel worker stopped (panicked) before reporting its group.
    WorkerFailed(String),
}

impl std::fmt::Display for CorrectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CorrectionError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            CorrectionError::InvalidConfiguration(msg) => {
                write!(f, "Invalid configuration: {}", msg)
            }
            CorrectionError::DegenerateDistribution(msg) => {
                write!(f, "Degenerate distribution: {}", msg)
            }
            CorrectionError::NoGroupSucceeded(diagnostics) => {
                write!(f, "No seasonal group produced a correction")?;
                for d in diagnostics {
                    write!(f, "\n  - {}", d)?;
                }
                Ok(())
            }
            CorrectionError::WorkerFailed(msg) => write!(f, "Worker failed: {}", msg),
        }
    }
}

impl std::error::Error for CorrectionError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_new_sorts_points_chronologically() {
        let series = FlowSeries::from_pairs(
            vec![day(1, 3), day(1, 1), day(1, 2)],
            vec![3.0, 1.0, 2.0],
        )
        .expect("valid series");
        assert_eq!(series.values(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_new_rejects_duplicate_timestamps() {
        let result = FlowSeries::from_pairs(vec![day(1, 1), day(1, 1)], vec![1.0, 2.0]);
        assert!(
            matches!(result, Err(CorrectionError::InvalidInput(_))),
            "duplicate timestamps must be rejected"
        );
    }

    #[test]
    fn test_new_rejects_negative_and_infinite_flows() {
        assert!(FlowSeries::from_pairs(vec![day(1, 1)], vec![-1.0]).is_err());
        assert!(FlowSeries::from_pairs(vec![day(1, 1)], vec![f64::INFINITY]).is_err());
    }

    #[test]
    fn test_new_keeps_missing_values_until_dropna() {
        let series = FlowSeries::from_pairs(
            vec![day(1, 1), day(1, 2), day(1, 3)],
            vec![1.0, f64::NAN, 3.0],
        )
        .expect("NaN is a valid missing marker");
        assert_eq!(series.len(), 3);
        assert_eq!(series.dropna().values(), vec![1.0, 3.0]);
    }

    #[test]
    fn test_from_pairs_length_mismatch() {
        let result = FlowSeries::from_pairs(vec![day(1, 1)], vec![1.0, 2.0]);
        assert!(matches!(result, Err(CorrectionError::InvalidInput(_))));
    }

    #[test]
    fn test_months_and_filter_months() {
        let series = FlowSeries::from_pairs(
            vec![day(3, 1), day(1, 5), day(1, 6), day(2, 1)],
            vec![1.0, 2.0, 3.0, 4.0],
        )
        .unwrap();
        assert_eq!(series.months(), vec![1, 2, 3]);

        let winter = series.filter_months(&[1, 2]);
        assert_eq!(winter.len(), 3);
        assert!(winter.points().iter().all(|p| p.timestamp.month() <= 2));
    }

    #[test]
    fn test_no_group_error_lists_every_group() {
        let err = CorrectionError::NoGroupSucceeded(vec![
            GroupDiagnostic {
                group: "month 01".to_string(),
                error: CorrectionError::InvalidInput("empty".to_string()),
            },
            GroupDiagnostic {
                group: "month 02".to_string(),
                error: CorrectionError::DegenerateDistribution("no scalars".to_string()),
            },
        ]);
        let message = err.to_string();
        assert!(message.contains("month 01"), "got: {}", message);
        assert!(message.contains("month 02"), "got: {}", message);
    }

    #[test]
    fn test_json_output_carries_skipped_groups() {
        let series = CorrectedFlowSeries {
            points: Vec::new(),
            gumbel_fits: Vec::new(),
            skipped: vec![GroupDiagnostic {
                group: "month 02".to_string(),
                error: CorrectionError::InvalidInput("no values".to_string()),
            }],
        };
        let json = serde_json::to_value(&series).expect("series serializes");
        assert_eq!(json["skipped"][0]["group"], "month 02");
        assert_eq!(json["skipped"][0]["error"], "Invalid input: no values");
    }
}
