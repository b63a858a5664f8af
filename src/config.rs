/// Correction configuration loader - parses correction.toml
///
/// Separates the numerical policy of a correction run (seasonality,
/// outlier handling, scalar-curve filtering, extrapolation, tail fitting)
/// from code, so a run can be re-tuned without recompiling.
///
/// ```toml
/// [correction]
/// seasonal = true
/// seasonality = "monthly"            # or [[12, 1, 2], [3, 4, 5], ...]
/// drop_outliers = false
/// outlier_zscore_threshold = 2.5
/// filter_scalar_curve = true
/// filter_percentile_range = [10.0, 90.0]
/// extrapolation = "average"
/// fit_gumbel = false
/// gumbel_trusted_range = [25.0, 75.0]
/// ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::analysis::fdc::DEFAULT_PROB_STEPS;
use crate::analysis::interpolate::ExtrapolationMethod;
use crate::analysis::percentile::PercentileKind;
use crate::analysis::scalar_bias::validate_range;
use crate::model::CorrectionError;

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "correction.toml";

/// Environment variable that overrides `DEFAULT_CONFIG_PATH`.
pub const CONFIG_ENV_VAR: &str = "FLOWPROP_CONFIG";

// ---------------------------------------------------------------------------
// Seasonality
// ---------------------------------------------------------------------------

/// How the record is partitioned before correction.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawSeasonality", into = "RawSeasonality")]
pub enum Seasonality {
    /// One group per calendar month present in the simulated gauge record.
    #[default]
    Monthly,
    /// One group per caller-supplied set of months.
    Groups(Vec<Vec<u32>>),
}

/// TOML shape of `seasonality`: a token or a list of month lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawSeasonality {
    Token(String),
    Groups(Vec<Vec<u32>>),
}

impl TryFrom<RawSeasonality> for Seasonality {
    type Error = CorrectionError;

    fn try_from(raw: RawSeasonality) -> Result<Self, Self::Error> {
        match raw {
            RawSeasonality::Token(token) => match token.trim().to_ascii_lowercase().as_str() {
                "monthly" => Ok(Seasonality::Monthly),
                other => Err(CorrectionError::InvalidConfiguration(format!(
                    "unknown seasonality '{}' (expected \"monthly\" or a list of month groups)",
                    other
                ))),
            },
            RawSeasonality::Groups(groups) => Ok(Seasonality::Groups(groups)),
        }
    }
}

impl From<Seasonality> for RawSeasonality {
    fn from(seasonality: Seasonality) -> Self {
        match seasonality {
            Seasonality::Monthly => RawSeasonality::Token("monthly".to_string()),
            Seasonality::Groups(groups) => RawSeasonality::Groups(groups),
        }
    }
}

impl Seasonality {
    /// Checks custom month groups: months in 1..=12, no empty group, and
    /// no month shared between groups.
    pub fn validate(&self) -> Result<(), CorrectionError> {
        let Seasonality::Groups(groups) = self else {
            return Ok(());
        };
        if groups.is_empty() {
            return Err(CorrectionError::InvalidConfiguration(
                "seasonality groups must not be empty".to_string(),
            ));
        }
        let mut seen = [false; 13];
        for group in groups {
            if group.is_empty() {
                return Err(CorrectionError::InvalidConfiguration(
                    "a seasonality group has no months".to_string(),
                ));
            }
            for &month in group {
                if !(1..=12).contains(&month) {
                    return Err(CorrectionError::InvalidConfiguration(format!(
                        "month {} is outside 1..=12",
                        month
                    )));
                }
                if seen[month as usize] {
                    return Err(CorrectionError::InvalidConfiguration(format!(
                        "month {} appears in more than one seasonality group",
                        month
                    )));
                }
                seen[month as usize] = true;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Correction options
// ---------------------------------------------------------------------------

/// Every switch of a correction run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectionConfig {
    /// Split the record into seasonal groups before correcting.
    pub seasonal: bool,
    pub seasonality: Seasonality,

    /// Drop z-score outliers from the gauge pair before building FDCs.
    pub drop_outliers: bool,
    pub outlier_zscore_threshold: f64,

    /// Restrict the scalar curve to `filter_percentile_range` before interpolating.
    pub filter_scalar_curve: bool,
    pub filter_percentile_range: (f64, f64),

    pub extrapolation: ExtrapolationMethod,
    /// Tail scalar for `extrapolation = "value"`.
    pub fill_value: Option<f64>,

    /// Replace values outside `gumbel_trusted_range` with Gumbel quantiles.
    pub fit_gumbel: bool,
    pub gumbel_trusted_range: (f64, f64),

    /// Resolution of the flow-duration curves.
    pub fdc_steps: usize,
    /// Label FDC percentiles as exceedance probability.
    pub exceedance: bool,
    pub percentile_kind: PercentileKind,

    /// Worker threads for seasonal groups; 1 runs sequentially.
    pub workers: usize,
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        Self {
            seasonal: true,
            seasonality: Seasonality::Monthly,
            drop_outliers: false,
            outlier_zscore_threshold: 2.5,
            filter_scalar_curve: true,
            filter_percentile_range: (10.0, 90.0),
            extrapolation: ExtrapolationMethod::Average,
            fill_value: None,
            fit_gumbel: false,
            gumbel_trusted_range: (25.0, 75.0),
            fdc_steps: DEFAULT_PROB_STEPS,
            exceedance: true,
            percentile_kind: PercentileKind::Mean,
            workers: 1,
        }
    }
}

impl CorrectionConfig {
    /// A configuration that processes the whole record as one group.
    pub fn non_seasonal() -> Self {
        Self {
            seasonal: false,
            ..Self::default()
        }
    }

    /// Checks option ranges and combinations before any computation.
    pub fn validate(&self) -> Result<(), CorrectionError> {
        if self.seasonal {
            self.seasonality.validate()?;
        }
        if self.drop_outliers
            && (!self.outlier_zscore_threshold.is_finite() || self.outlier_zscore_threshold <= 0.0)
        {
            return Err(CorrectionError::InvalidConfiguration(format!(
                "outlier_zscore_threshold must be positive, got {}",
                self.outlier_zscore_threshold
            )));
        }
        if self.filter_scalar_curve {
            let (low, high) = self.filter_percentile_range;
            validate_range("filter_percentile_range", low, high)?;
        }
        if self.fit_gumbel {
            let (low, high) = self.gumbel_trusted_range;
            validate_range("gumbel_trusted_range", low, high)?;
        }
        if self.extrapolation == ExtrapolationMethod::Value {
            match self.fill_value {
                Some(v) if v.is_finite() => {}
                Some(v) => {
                    return Err(CorrectionError::InvalidConfiguration(format!(
                        "fill_value must be finite, got {}",
                        v
                    )));
                }
                None => {
                    return Err(CorrectionError::InvalidConfiguration(
                        "extrapolation \"value\" requires fill_value".to_string(),
                    ));
                }
            }
        }
        if self.fdc_steps == 0 {
            return Err(CorrectionError::InvalidConfiguration(
                "fdc_steps must be at least 1".to_string(),
            ));
        }
        if self.workers == 0 {
            return Err(CorrectionError::InvalidConfiguration(
                "workers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// File loading
// ---------------------------------------------------------------------------

/// Root structure of correction.toml.
#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    correction: CorrectionConfig,
}

/// Errors from loading a configuration file.
#[derive(Debug)]
pub enum ConfigError {
    /// The file could not be read.
    Io { path: String, source: std::io::Error },
    /// The TOML is malformed or holds an unknown token.
    Parse { path: String, message: String },
    /// The options parsed but are inconsistent.
    Invalid(CorrectionError),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io { path, source } => write!(f, "Failed to read {}: {}", path, source),
            ConfigError::Parse { path, message } => {
                write!(f, "Failed to parse {}: {}", path, message)
            }
            ConfigError::Invalid(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Parses and validates configuration text.
pub fn parse_config(contents: &str, origin: &str) -> Result<CorrectionConfig, ConfigError> {
    let file: ConfigFile = toml::from_str(contents).map_err(|e| ConfigError::Parse {
        path: origin.to_string(),
        message: e.to_string(),
    })?;
    file.correction.validate().map_err(ConfigError::Invalid)?;
    Ok(file.correction)
}

/// Loads and validates a configuration file.
pub fn load_config(path: impl AsRef<Path>) -> Result<CorrectionConfig, ConfigError> {
    let path = path.as_ref();
    let display = path.display().to_string();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: display.clone(),
        source,
    })?;
    parse_config(&contents, &display)
}

/// Resolves the configuration path: explicit argument, then
/// `FLOWPROP_CONFIG` (a `.env` file is honoured), then `correction.toml`.
pub fn resolve_config_path(explicit: Option<&str>) -> String {
    if let Some(path) = explicit {
        return path.to_string();
    }
    dotenv::dotenv().ok();
    std::env::var(CONFIG_ENV_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = parse_config("", "inline").expect("empty config is valid");
        assert_eq!(config, CorrectionConfig::default());
        assert_eq!(config.extrapolation, ExtrapolationMethod::Average);
        assert_eq!(config.filter_percentile_range, (10.0, 90.0));
        assert_eq!(config.fdc_steps, 500);
    }

    #[test]
    fn test_full_table_parses() {
        let toml = r#"
            [correction]
            seasonal = true
            seasonality = [[12, 1, 2], [3, 4, 5], [6, 7, 8], [9, 10, 11]]
            drop_outliers = true
            outlier_zscore_threshold = 1.5
            filter_scalar_curve = true
            filter_percentile_range = [5.0, 95.0]
            extrapolation = "value"
            fill_value = 2.0
            fit_gumbel = true
            gumbel_trusted_range = [20.0, 80.0]
            percentile_kind = "weak"
            workers = 4
        "#;
        let config = parse_config(toml, "inline").unwrap();
        assert_eq!(
            config.seasonality,
            Seasonality::Groups(vec![vec![12, 1, 2], vec![3, 4, 5], vec![6, 7, 8], vec![9, 10, 11]])
        );
        assert!(config.drop_outliers);
        assert_eq!(config.outlier_zscore_threshold, 1.5);
        assert_eq!(config.extrapolation, ExtrapolationMethod::Value);
        assert_eq!(config.fill_value, Some(2.0));
        assert_eq!(config.gumbel_trusted_range, (20.0, 80.0));
        assert_eq!(config.percentile_kind, PercentileKind::Weak);
        assert_eq!(config.workers, 4);
    }

    #[test]
    fn test_unknown_extrapolation_token_fails() {
        let result = parse_config("[correction]\nextrapolation = \"spline\"\n", "inline");
        match result {
            Err(ConfigError::Parse { message, .. }) => {
                assert!(message.contains("spline"), "got: {}", message)
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_seasonality_token_fails() {
        let result = parse_config("[correction]\nseasonality = \"weekly\"\n", "inline");
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_value_without_fill_is_invalid() {
        let mut config = CorrectionConfig::default();
        config.extrapolation = ExtrapolationMethod::Value;
        assert!(matches!(
            config.validate(),
            Err(CorrectionError::InvalidConfiguration(_))
        ));
        config.fill_value = Some(1.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_inverted_ranges_are_invalid() {
        let mut config = CorrectionConfig::default();
        config.filter_percentile_range = (90.0, 10.0);
        assert!(config.validate().is_err());

        let mut config = CorrectionConfig::default();
        config.fit_gumbel = true;
        config.gumbel_trusted_range = (75.0, 75.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overlapping_or_bad_month_groups_are_invalid() {
        let overlapping = Seasonality::Groups(vec![vec![1, 2], vec![2, 3]]);
        assert!(overlapping.validate().is_err());
        assert!(Seasonality::Groups(vec![vec![13]]).validate().is_err());
        assert!(Seasonality::Groups(vec![vec![]]).validate().is_err());
        assert!(Seasonality::Groups(vec![vec![1], vec![7, 8]]).validate().is_ok());
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        let mut config = CorrectionConfig::default();
        config.seasonality = Seasonality::Groups(vec![vec![6, 7, 8]]);
        config.extrapolation = ExtrapolationMethod::GlobalMin;
        let text = toml::to_string(&ConfigFileOut { correction: &config }).unwrap();
        let parsed = parse_config(&text, "round-trip").unwrap();
        assert_eq!(parsed, config);
    }

    #[derive(Serialize)]
    struct ConfigFileOut<'a> {
        correction: &'a CorrectionConfig,
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = load_config("definitely/not/here/correction.toml");
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_explicit_path_wins() {
        assert_eq!(resolve_config_path(Some("custom.toml")), "custom.toml");
    }
}
