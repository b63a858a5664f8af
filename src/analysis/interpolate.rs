/// Continuous percentile → scalar lookup.
///
/// A `ScalarInterpolator` turns the discrete scalar-bias curve into a
/// function usable at any percentile. The `ExtrapolationMethod` chosen in
/// the configuration decides two things: how the interior is interpolated
/// (linear, or nearest-neighbour for `nearest`) and what each tail returns
/// for queries outside the covered percentile range.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::analysis::scalar_bias::ScalarBiasCurve;
use crate::model::CorrectionError;

// ---------------------------------------------------------------------------
// Policy selection
// ---------------------------------------------------------------------------

/// Extrapolation policy selected in the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ExtrapolationMethod {
    /// Extend the end segments linearly.
    Linear,
    /// Nearest neighbour everywhere, boundary scalar outside.
    Nearest,
    /// Mean of the retained scalars outside.
    #[default]
    Average,
    /// Largest retained scalar outside.
    Max,
    /// Smallest retained scalar outside.
    Min,
    /// Smallest scalar of the unfiltered whole-record curve outside.
    GlobalMin,
    /// Mean scalar of the unfiltered whole-record curve outside.
    GlobalAverage,
    /// Caller-supplied `fill_value` outside.
    Value,
}

impl ExtrapolationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtrapolationMethod::Linear => "linear",
            ExtrapolationMethod::Nearest => "nearest",
            ExtrapolationMethod::Average => "average",
            ExtrapolationMethod::Max => "max",
            ExtrapolationMethod::Min => "min",
            ExtrapolationMethod::GlobalMin => "globalmin",
            ExtrapolationMethod::GlobalAverage => "globalaverage",
            ExtrapolationMethod::Value => "value",
        }
    }

    /// Whether the policy borrows statistics from the whole-record curve.
    pub fn needs_global_stats(&self) -> bool {
        matches!(
            self,
            ExtrapolationMethod::GlobalMin | ExtrapolationMethod::GlobalAverage
        )
    }
}

impl FromStr for ExtrapolationMethod {
    type Err = CorrectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linear" => Ok(ExtrapolationMethod::Linear),
            "nearest" => Ok(ExtrapolationMethod::Nearest),
            "average" => Ok(ExtrapolationMethod::Average),
            "max" | "maximum" => Ok(ExtrapolationMethod::Max),
            "min" | "minimum" => Ok(ExtrapolationMethod::Min),
            "globalmin" => Ok(ExtrapolationMethod::GlobalMin),
            "globalaverage" => Ok(ExtrapolationMethod::GlobalAverage),
            "value" => Ok(ExtrapolationMethod::Value),
            other => Err(CorrectionError::InvalidConfiguration(format!(
                "unknown extrapolation method '{}'",
                other
            ))),
        }
    }
}

impl TryFrom<String> for ExtrapolationMethod {
    type Error = CorrectionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ExtrapolationMethod> for String {
    fn from(method: ExtrapolationMethod) -> Self {
        method.as_str().to_string()
    }
}

/// Summary of the unfiltered whole-record scalar curve, used by the
/// `globalmin` and `globalaverage` policies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalScalarStats {
    pub min: f64,
    pub mean: f64,
}

impl GlobalScalarStats {
    pub fn from_curve(curve: &ScalarBiasCurve) -> Result<Self, CorrectionError> {
        match (curve.min(), curve.mean()) {
            (Some(min), Some(mean)) => Ok(Self { min, mean }),
            _ => Err(CorrectionError::DegenerateDistribution(
                "whole-record scalar curve has no finite scalars".to_string(),
            )),
        }
    }
}

/// Everything the interpolator needs besides the curve itself.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ExtrapolationContext {
    pub fill_value: Option<f64>,
    pub global: Option<GlobalScalarStats>,
}

// ---------------------------------------------------------------------------
// Interpolator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
enum Interior {
    Linear,
    Nearest,
}

/// What a query outside the covered range returns.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Tail {
    Extrapolate,
    Clamp,
    Fill(f64),
}

/// Percentile → scalar function built from a scalar-bias curve.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarInterpolator {
    xs: Vec<f64>,
    ys: Vec<f64>,
    interior: Interior,
    tail: Tail,
}

impl ScalarInterpolator {
    /// Builds the interpolator for `method`.
    ///
    /// # Errors
    /// - `DegenerateDistribution` - the curve is empty.
    /// - `InvalidConfiguration` - `value` without a fill value, or a global
    ///   policy without whole-record statistics.
    pub fn new(
        curve: &ScalarBiasCurve,
        method: ExtrapolationMethod,
        context: &ExtrapolationContext,
    ) -> Result<Self, CorrectionError> {
        if curve.is_empty() {
            return Err(CorrectionError::DegenerateDistribution(
                "scalar-bias curve is empty after removing invalid ratios".to_string(),
            ));
        }

        // Sort by percentile; exceedance curves arrive in descending order.
        let mut points = curve.points.clone();
        points.sort_by(|a, b| a.percentile.total_cmp(&b.percentile));
        points.dedup_by(|a, b| a.percentile == b.percentile);
        let xs: Vec<f64> = points.iter().map(|p| p.percentile).collect();
        let ys: Vec<f64> = points.iter().map(|p| p.scalar).collect();

        let (interior, tail) = match method {
            ExtrapolationMethod::Linear => (Interior::Linear, Tail::Extrapolate),
            ExtrapolationMethod::Nearest => (Interior::Nearest, Tail::Clamp),
            ExtrapolationMethod::Average => (Interior::Linear, Tail::Fill(retained(curve.mean())?)),
            ExtrapolationMethod::Max => (Interior::Linear, Tail::Fill(retained(curve.max())?)),
            ExtrapolationMethod::Min => (Interior::Linear, Tail::Fill(retained(curve.min())?)),
            ExtrapolationMethod::GlobalMin => {
                let global = context.global.ok_or_else(missing_global)?;
                (Interior::Linear, Tail::Fill(global.min))
            }
            ExtrapolationMethod::GlobalAverage => {
                let global = context.global.ok_or_else(missing_global)?;
                (Interior::Linear, Tail::Fill(global.mean))
            }
            ExtrapolationMethod::Value => {
                let value = context.fill_value.ok_or_else(|| {
                    CorrectionError::InvalidConfiguration(
                        "extrapolation 'value' requires fill_value".to_string(),
                    )
                })?;
                (Interior::Linear, Tail::Fill(value))
            }
        };

        Ok(Self { xs, ys, interior, tail })
    }

    /// Lowest and highest covered percentile.
    pub fn range(&self) -> (f64, f64) {
        (self.xs[0], self.xs[self.xs.len() - 1])
    }

    /// Scalar at percentile `p`.
    ///
    /// A single-point curve returns its scalar everywhere, whatever the
    /// tail policy.
    pub fn scalar_at(&self, p: f64) -> f64 {
        let n = self.xs.len();
        if n == 1 {
            return self.ys[0];
        }
        let (lo, hi) = self.range();

        if p < lo || p > hi {
            return match self.tail {
                Tail::Fill(value) => value,
                Tail::Clamp => {
                    if p < lo {
                        self.ys[0]
                    } else {
                        self.ys[n - 1]
                    }
                }
                Tail::Extrapolate => {
                    if p < lo {
                        line(self.xs[0], self.ys[0], self.xs[1], self.ys[1], p)
                    } else {
                        line(self.xs[n - 2], self.ys[n - 2], self.xs[n - 1], self.ys[n - 1], p)
                    }
                }
            };
        }

        // First index with xs[i] >= p; p is inside [lo, hi] so 0 <= i < n.
        let i = self.xs.partition_point(|&x| x < p);
        if self.xs[i] == p || i == 0 {
            return self.ys[i];
        }

        match self.interior {
            Interior::Linear => line(self.xs[i - 1], self.ys[i - 1], self.xs[i], self.ys[i], p),
            Interior::Nearest => {
                // Ties go to the lower percentile.
                if p - self.xs[i - 1] <= self.xs[i] - p {
                    self.ys[i - 1]
                } else {
                    self.ys[i]
                }
            }
        }
    }

    /// Scalars for a batch of percentiles.
    pub fn scalars_at(&self, percentiles: &[f64]) -> Vec<f64> {
        percentiles.iter().map(|&p| self.scalar_at(p)).collect()
    }
}

fn line(x0: f64, y0: f64, x1: f64, y1: f64, x: f64) -> f64 {
    y0 + (y1 - y0) * (x - x0) / (x1 - x0)
}

fn retained(stat: Option<f64>) -> Result<f64, CorrectionError> {
    stat.ok_or_else(|| {
        CorrectionError::DegenerateDistribution("scalar-bias curve has no scalars".to_string())
    })
}

fn missing_global() -> CorrectionError {
    CorrectionError::InvalidConfiguration(
        "global extrapolation requires the whole-record scalar curve".to_string(),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
