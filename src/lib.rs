/// flowprop: propagate a gauge's streamflow bias correction to simulated
/// flow at ungauged points.
///
/// # Module structure
///
/// ```text
/// flowprop
/// ├── model       - shared data types (FlowSeries, CorrectedFlowSeries, CorrectionError, …)
/// ├── config      - correction options loader (correction.toml)
/// ├── network     - drainage-line connectivity and downstream walks
/// ├── ingest
/// │   ├── csv     - flow CSV parsing and corrected/FDC CSV export
/// │   ├── http    - gauge CSV over HTTP (HydroShare)
/// │   ├── usgs    - USGS NWIS Daily Values discharge client
/// │   └── fixtures (test only) - representative payloads
/// └── analysis
///     ├── fdc         - flow-duration curves
///     ├── scalar_bias - obs/sim scalar-bias curves
///     ├── percentile  - self-percentile ranking
///     ├── interpolate - percentile → scalar lookup and extrapolation
///     ├── outliers    - z-score filtering of the gauge records
///     ├── gumbel      - Gumbel Type I tail correction
///     └── propagate   - seasonal orchestration
/// ```

/// Public modules
pub mod analysis;
pub mod config;
pub mod ingest;
pub mod model;
pub mod network;

/// Installs the `tracing` subscriber used by every binary.
///
/// Honors `RUST_LOG`; defaults to `info`.
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // A second call (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
