/// Flow statistics and the bias-correction pipeline.
///
/// Submodules:
/// - `fdc`          - flow-duration curves on a fixed percentile grid.
/// - `scalar_bias`  - obs/sim ratio curves and percentile-band filtering.
/// - `percentile`   - percentile-of-score ranking of a series within itself.
/// - `interpolate`  - percentile → scalar lookup with extrapolation policies.
/// - `outliers`     - z-score filtering of the gauge records.
/// - `gumbel`       - Gumbel Type I tail replacement.
/// - `propagate`    - seasonal orchestration of the whole correction.

pub mod fdc;
pub mod gumbel;
pub mod interpolate;
pub mod outliers;
pub mod percentile;
pub mod propagate;
pub mod scalar_bias;

pub use fdc::{FlowDurationCurve, flow_duration_curve};
pub use interpolate::{ExtrapolationMethod, ScalarInterpolator};
pub use percentile::{PercentileKind, percentile_of_score, self_percentiles};
pub use propagate::propagate_correction;
pub use scalar_bias::{ScalarBiasCurve, scalar_bias_curve};
