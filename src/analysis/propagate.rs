/// Bias-correction propagation.
///
/// Derives a scalar-bias curve from a gauge's simulated and observed
/// records and applies it to a simulated series at an ungauged point.
///
/// # Process
///
/// 1. **Season split** - `Monthly` makes one group per calendar month of
///    the simulated gauge record; `Groups` makes one per month set; a
///    non-seasonal run is a single group covering the full record.
/// 2. **Per group** (the non-seasonal terminal state):
///    - drop missing values, optionally drop gauge outliers
///    - scalar curve = FDC(observed) / FDC(simulated), optionally band-filtered
///    - self-percentile of every target value, scalar lookup
///    - corrected = target × scalar, optional Gumbel tail correction
/// 3. **Merge** - concatenate successful groups, sort chronologically.
///
/// Under seasonal decomposition a failing group is logged, recorded in
/// `CorrectedFlowSeries::skipped` and left out; the run only fails when no
/// group succeeds. A non-seasonal run fails on the first error.

use std::sync::{Arc, mpsc};

use threadpool::ThreadPool;

use crate::analysis::gumbel::correct_tails;
use crate::analysis::interpolate::{ExtrapolationContext, GlobalScalarStats, ScalarInterpolator};
use crate::analysis::outliers::drop_outliers;
use crate::analysis::percentile::self_percentiles;
use crate::analysis::scalar_bias::{ScalarBiasCurve, scalar_bias_curve};
use crate::config::{CorrectionConfig, Seasonality};
use crate::model::{
    CorrectedFlowSeries, CorrectedPoint, CorrectionError, FlowSeries, GroupDiagnostic, GumbelFit,
};

// ---------------------------------------------------------------------------
// Season groups
// ---------------------------------------------------------------------------

/// A slice of the calendar processed as one non-seasonal run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Season {
    /// The full record.
    All,
    /// Every point whose calendar month is listed.
    Months(Vec<u32>),
}

impl Season {
    pub fn label(&self) -> String {
        match self {
            Season::All => "full record".to_string(),
            Season::Months(months) if months.len() == 1 => format!("month {:02}", months[0]),
            Season::Months(months) => {
                let list: Vec<String> = months.iter().map(|m| m.to_string()).collect();
                format!("months {}", list.join(","))
            }
        }
    }

    fn select(&self, series: &FlowSeries) -> FlowSeries {
        match self {
            Season::All => series.clone(),
            Season::Months(months) => series.filter_months(months),
        }
    }
}

/// Resolves the configuration into the groups to process.
///
/// Monthly groups come from the months present in the simulated gauge
/// record's dates, in ascending order. A month whose values are all
/// missing still becomes a group, so its skip is recorded.
pub fn split_groups(
    config: &CorrectionConfig,
    sim_at_gauge: &FlowSeries,
) -> Result<Vec<Season>, CorrectionError> {
    if !config.seasonal {
        return Ok(vec![Season::All]);
    }
    config.seasonality.validate()?;
    Ok(match &config.seasonality {
        Seasonality::Monthly => sim_at_gauge
            .months()
            .into_iter()
            .map(|m| Season::Months(vec![m]))
            .collect(),
        Seasonality::Groups(groups) => groups.iter().cloned().map(Season::Months).collect(),
    })
}

// ---------------------------------------------------------------------------
// Non-seasonal correction
// ---------------------------------------------------------------------------

/// Output of one non-seasonal run.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupCorrection {
    pub points: Vec<CorrectedPoint>,
    pub gumbel: Option<GumbelFit>,
}

fn require_values(series: &FlowSeries, name: &str) -> Result<(), CorrectionError> {
    if series.is_empty() {
        return Err(CorrectionError::InvalidInput(format!(
            "{} has no values after dropping missing data",
            name
        )));
    }
    Ok(())
}

/// Scalar-bias curve of a gauge pair, with optional outlier removal.
///
/// Both series must already be NaN-free.
pub fn gauge_scalar_curve(
    sim_at_gauge: &FlowSeries,
    obs_at_gauge: &FlowSeries,
    config: &CorrectionConfig,
) -> Result<ScalarBiasCurve, CorrectionError> {
    let (sim, obs) = if config.drop_outliers {
        (
            drop_outliers(sim_at_gauge, config.outlier_zscore_threshold)?,
            drop_outliers(obs_at_gauge, config.outlier_zscore_threshold)?,
        )
    } else {
        (sim_at_gauge.clone(), obs_at_gauge.clone())
    };

    scalar_bias_curve(&obs.values(), &sim.values(), config.fdc_steps, config.exceedance)
}

/// Corrects one group as a single, non-seasonal record.
///
/// `global` carries the whole-record scalar statistics for the
/// `globalmin`/`globalaverage` policies.
pub fn correct_group(
    sim_at_gauge: &FlowSeries,
    obs_at_gauge: &FlowSeries,
    sim_to_correct: &FlowSeries,
    config: &CorrectionConfig,
    global: Option<GlobalScalarStats>,
) -> Result<GroupCorrection, CorrectionError> {
    let sim = sim_at_gauge.dropna();
    let obs = obs_at_gauge.dropna();
    let target = sim_to_correct.dropna();
    require_values(&sim, "simulated gauge series")?;
    require_values(&obs, "observed gauge series")?;
    require_values(&target, "series to correct")?;

    let mut curve = gauge_scalar_curve(&sim, &obs, config)?;
    if curve.is_empty() {
        return Err(CorrectionError::DegenerateDistribution(
            "every observed/simulated ratio was invalid".to_string(),
        ));
    }
    if config.filter_scalar_curve {
        let (low, high) = config.filter_percentile_range;
        curve = curve.filter_range(low, high)?;
    }

    let context = ExtrapolationContext {
        fill_value: config.fill_value,
        global,
    };
    let interpolator = ScalarInterpolator::new(&curve, config.extrapolation, &context)?;

    let flows = target.values();
    let percentiles = self_percentiles(&flows, config.percentile_kind)?;
    let scalars = interpolator.scalars_at(&percentiles);
    let mut corrected: Vec<f64> = flows.iter().zip(&scalars).map(|(f, s)| f * s).collect();

    let gumbel = if config.fit_gumbel {
        correct_tails(&mut corrected, &percentiles, config.gumbel_trusted_range)?
    } else {
        None
    };

    let points = target
        .points()
        .iter()
        .enumerate()
        .map(|(i, p)| CorrectedPoint {
            timestamp: p.timestamp,
            corrected_flow: corrected[i],
            scalar: scalars[i],
            percentile: percentiles[i],
        })
        .collect();

    Ok(GroupCorrection { points, gumbel })
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Propagates the gauge bias correction onto `sim_to_correct`.
///
/// The scalar convention is fixed: scalar = observed / simulated at the
/// gauge, and corrected = simulated-to-correct × scalar.
///
/// # Errors
/// - `InvalidConfiguration` - invalid options (checked before any work).
/// - `InvalidInput` - an input series is empty after dropping missing values.
/// - Any group error in a non-seasonal run.
/// - `NoGroupSucceeded` - seasonal run where every group failed.
pub fn propagate_correction(
    sim_at_gauge: &FlowSeries,
    obs_at_gauge: &FlowSeries,
    sim_to_correct: &FlowSeries,
    config: &CorrectionConfig,
) -> Result<CorrectedFlowSeries, CorrectionError> {
    config.validate()?;
    require_values(&sim_at_gauge.dropna(), "simulated gauge series")?;
    require_values(&obs_at_gauge.dropna(), "observed gauge series")?;
    require_values(&sim_to_correct.dropna(), "series to correct")?;

    let global = if config.extrapolation.needs_global_stats() {
        let curve = gauge_scalar_curve(&sim_at_gauge.dropna(), &obs_at_gauge.dropna(), config)?;
        Some(GlobalScalarStats::from_curve(&curve)?)
    } else {
        None
    };

    let groups = split_groups(config, sim_at_gauge)?;
    tracing::info!(
        groups = groups.len(),
        extrapolation = config.extrapolation.as_str(),
        "propagating bias correction"
    );

    let outcomes = if config.workers > 1 && groups.len() > 1 {
        run_parallel(groups, sim_at_gauge, obs_at_gauge, sim_to_correct, config, global)
    } else {
        groups
            .into_iter()
            .map(|season| {
                let result = run_group(&season, sim_at_gauge, obs_at_gauge, sim_to_correct, config, global);
                (season, result)
            })
            .collect()
    };

    merge(outcomes, config.seasonal)
}

fn run_group(
    season: &Season,
    sim_at_gauge: &FlowSeries,
    obs_at_gauge: &FlowSeries,
    sim_to_correct: &FlowSeries,
    config: &CorrectionConfig,
    global: Option<GlobalScalarStats>,
) -> Result<GroupCorrection, CorrectionError> {
    tracing::debug!(group = %season.label(), "correcting group");
    correct_group(
        &season.select(sim_at_gauge),
        &season.select(obs_at_gauge),
        &season.select(sim_to_correct),
        config,
        global,
    )
}

/// Fans groups out to a thread pool and collects them over a channel.
///
/// Outcomes are re-ordered to the group order so the merge is identical
/// to a sequential run.
fn run_parallel(
    groups: Vec<Season>,
    sim_at_gauge: &FlowSeries,
    obs_at_gauge: &FlowSeries,
    sim_to_correct: &FlowSeries,
    config: &CorrectionConfig,
    global: Option<GlobalScalarStats>,
) -> Vec<(Season, Result<GroupCorrection, CorrectionError>)> {
    let pool = ThreadPool::new(config.workers.min(groups.len()));
    let shared = Arc::new((
        sim_at_gauge.clone(),
        obs_at_gauge.clone(),
        sim_to_correct.clone(),
        config.clone(),
    ));
    let (tx, rx) = mpsc::channel();
    let count = groups.len();
    let labels = groups.clone();

    for (index, season) in groups.into_iter().enumerate() {
        let tx = tx.clone();
        let shared = Arc::clone(&shared);
        pool.execute(move || {
            let (sim, obs, target, config) = &*shared;
            let result = run_group(&season, sim, obs, target, config, global);
            // The receiver outlives every job.
            let _ = tx.send((index, season, result));
        });
    }
    drop(tx);

    // A panicking job drops its sender, so the iterator ends short.
    collect_outcomes(labels, rx.iter().take(count).collect())
}

/// Orders received outcomes by group index and turns every group that
/// never reported into a `WorkerFailed` outcome.
fn collect_outcomes(
    groups: Vec<Season>,
    received: Vec<(usize, Season, Result<GroupCorrection, CorrectionError>)>,
) -> Vec<(Season, Result<GroupCorrection, CorrectionError>)> {
    let mut slots: Vec<Option<(Season, Result<GroupCorrection, CorrectionError>)>> =
        groups.iter().map(|_| None).collect();
    for (index, season, result) in received {
        if let Some(slot) = slots.get_mut(index) {
            *slot = Some((season, result));
        }
    }

    slots
        .into_iter()
        .zip(groups)
        .map(|(slot, season)| {
            slot.unwrap_or_else(|| {
                let error = CorrectionError::WorkerFailed(format!(
                    "no result for {}",
                    season.label()
                ));
                (season, Err(error))
            })
        })
        .collect()
}

fn merge(
    outcomes: Vec<(Season, Result<GroupCorrection, CorrectionError>)>,
    seasonal: bool,
) -> Result<CorrectedFlowSeries, CorrectionError> {
    let mut merged = CorrectedFlowSeries::default();

    for (season, result) in outcomes {
        match result {
            Ok(group) => {
                if let Some(fit) = group.gumbel {
                    merged.gumbel_fits.push((season.label(), fit));
                }
                merged.points.extend(group.points);
            }
            Err(error) if seasonal => {
                tracing::warn!(group = %season.label(), %error, "skipping seasonal group");
                merged.skipped.push(GroupDiagnostic {
                    group: season.label(),
                    error,
                });
            }
            Err(error) => return Err(error),
        }
    }

    if merged.points.is_empty() {
        return Err(CorrectionError::NoGroupSucceeded(merged.skipped));
    }

    merged.points.sort_by_key(|p| p.timestamp);
    tracing::info!(
        points = merged.points.len(),
        skipped = merged.skipped.len(),
        "bias correction complete"
    );
    Ok(merged)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
