//! flowprop - Bias-correction propagation
//!
//! Corrects simulated streamflow at an ungauged point using the bias
//! observed at a nearby gauge:
//! 1. Loads the simulated and observed records at the gauge
//! 2. Loads the simulated record to correct
//! 3. Builds the scalar-bias curve (per month by default) and applies it
//! 4. Writes the corrected series as CSV (or JSON)
//!
//! Usage:
//!   flowprop --sim-gauge sim.csv --obs-gauge obs.csv --target downstream.csv
//!   flowprop --sim-gauge sim.csv --usgs-site 05568500 --start 1990-01-01 --end 2020-12-31 \
//!            --target downstream.csv --output corrected.csv
//!   flowprop ... --ideam-station 32097010
//!
//! Options:
//!   --config PATH   correction.toml to use (default: $FLOWPROP_CONFIG or ./correction.toml)
//!   --output PATH   write results here instead of stdout
//!   --json          emit JSON instead of CSV
//!
//! Without --output, progress lines go to stderr so stdout carries only
//! the results.
//!
//! Environment:
//!   FLOWPROP_CONFIG - configuration path (a .env file is honoured)
//!   RUST_LOG        - log filter (default: info)

use flowprop::analysis::propagate_correction;
use flowprop::config::{CorrectionConfig, load_config, resolve_config_path};
use flowprop::ingest::csv::{CsvFileSource, format_corrected_csv};
use flowprop::ingest::http::HttpCsvSource;
use flowprop::ingest::usgs::UsgsDailySource;
use flowprop::ingest::FlowSource;
use flowprop::model::FlowSeries;

use chrono::NaiveDate;
use std::env;
use std::fs;
use std::path::Path;

#[derive(Debug, Default)]
struct Args {
    sim_gauge: Option<String>,
    obs_gauge: Option<String>,
    usgs_site: Option<String>,
    ideam_station: Option<String>,
    start: Option<String>,
    end: Option<String>,
    target: Option<String>,
    config: Option<String>,
    output: Option<String>,
    json: bool,
}

/// Progress reporting. Goes to stderr whenever stdout carries the results.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Progress {
    to_stderr: bool,
}

impl Progress {
    fn for_args(args: &Args) -> Self {
        Progress {
            to_stderr: args.output.is_none(),
        }
    }

    fn line(&self, text: impl std::fmt::Display) {
        if self.to_stderr {
            eprintln!("{}", text);
        } else {
            println!("{}", text);
        }
    }
}

fn usage(program: &str) -> String {
    format!(
        "Usage: {} --sim-gauge PATH (--obs-gauge PATH | --usgs-site SITE --start DATE --end DATE | --ideam-station ID) \
         --target PATH [--config PATH] [--output PATH] [--json]",
        program
    )
}

fn parse_args(args: &[String]) -> Result<Args, String> {
    let mut parsed = Args::default();
    let mut i = 1;
    while i < args.len() {
        let flag = args[i].as_str();
        if flag == "--json" {
            parsed.json = true;
            i += 1;
            continue;
        }

        let value = args
            .get(i + 1)
            .cloned()
            .ok_or_else(|| format!("{} requires a value", flag))?;
        let slot = match flag {
            "--sim-gauge" => &mut parsed.sim_gauge,
            "--obs-gauge" => &mut parsed.obs_gauge,
            "--usgs-site" => &mut parsed.usgs_site,
            "--ideam-station" => &mut parsed.ideam_station,
            "--start" => &mut parsed.start,
            "--end" => &mut parsed.end,
            "--target" => &mut parsed.target,
            "--config" => &mut parsed.config,
            "--output" => &mut parsed.output,
            _ => return Err(format!("Unknown argument: {}", flag)),
        };
        *slot = Some(value);
        i += 2;
    }
    Ok(parsed)
}

fn parse_date(flag: &str, value: Option<&String>) -> Result<NaiveDate, String> {
    let value = value.ok_or_else(|| format!("--usgs-site requires {}", flag))?;
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| format!("{} '{}' is not YYYY-MM-DD: {}", flag, value, e))
}

/// Picks the observed-flow collaborator from the arguments.
fn observed_source(args: &Args) -> Result<Box<dyn FlowSource>, String> {
    match (&args.obs_gauge, &args.usgs_site, &args.ideam_station) {
        (Some(path), None, None) => Ok(Box::new(CsvFileSource::new(path))),
        (None, Some(site), None) => {
            let start = parse_date("--start", args.start.as_ref())?;
            let end = parse_date("--end", args.end.as_ref())?;
            Ok(Box::new(UsgsDailySource::new(site.as_str(), start, end)))
        }
        (None, None, Some(station)) => Ok(Box::new(HttpCsvSource::ideam_station(station))),
        (None, None, None) => Err("an observed gauge record is required".to_string()),
        _ => Err("give only one of --obs-gauge, --usgs-site, --ideam-station".to_string()),
    }
}

fn load_correction_config(
    explicit: Option<&str>,
    progress: Progress,
) -> Result<CorrectionConfig, Box<dyn std::error::Error>> {
    let path = resolve_config_path(explicit);
    if explicit.is_none() && !Path::new(&path).exists() {
        progress.line(format!("⚙️  No {} found, using default options", path));
        return Ok(CorrectionConfig::default());
    }
    let config = load_config(&path)?;
    progress.line(format!("⚙️  Loaded options from {}", path));
    Ok(config)
}

fn load(
    label: &str,
    source: &dyn FlowSource,
    progress: Progress,
) -> Result<FlowSeries, Box<dyn std::error::Error>> {
    progress.line(format!("📥 {}: {}", label, source.describe()));
    let series = source.load()?;
    progress.line(format!(
        "   {} values ({} missing)",
        series.len(),
        series.len() - series.dropna().len()
    ));
    Ok(series)
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let progress = Progress::for_args(&args);
    let sim_path = args.sim_gauge.as_deref().ok_or("--sim-gauge is required")?;
    let target_path = args.target.as_deref().ok_or("--target is required")?;
    let observed = observed_source(&args)?;

    let config = load_correction_config(args.config.as_deref(), progress)?;
    progress.line(format!(
        "   seasonal: {}, extrapolation: {}, gumbel: {}",
        config.seasonal,
        config.extrapolation.as_str(),
        config.fit_gumbel
    ));

    let sim_at_gauge = load("Simulated at gauge", &CsvFileSource::new(sim_path), progress)?;
    let obs_at_gauge = load("Observed at gauge", observed.as_ref(), progress)?;
    let sim_to_correct = load("Simulated to correct", &CsvFileSource::new(target_path), progress)?;

    progress.line("\n🔧 Propagating bias correction...");
    let corrected = propagate_correction(&sim_at_gauge, &obs_at_gauge, &sim_to_correct, &config)?;

    for diagnostic in &corrected.skipped {
        progress.line(format!("   ⚠️  skipped {}", diagnostic));
    }
    for (group, fit) in &corrected.gumbel_fits {
        progress.line(format!(
            "   📈 {} gumbel fit: x̄ = {:.3}, σ = {:.3}",
            group, fit.xbar, fit.std
        ));
    }

    let rendered = if args.json {
        serde_json::to_string_pretty(&corrected)?
    } else {
        format_corrected_csv(&corrected)
    };

    match &args.output {
        Some(path) => {
            fs::write(path, rendered)?;
            println!("\n✅ Wrote {} corrected values to {}", corrected.len(), path);
        }
        None => print!("{}", rendered),
    }
    Ok(())
}

fn main() {
    flowprop::init_logging();

    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("flowprop");

    let parsed = match parse_args(&args) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("{}", usage(program));
            std::process::exit(1);
        }
    };

    let progress = Progress::for_args(&parsed);
    progress.line("🌊 Streamflow Bias-Correction Propagation");
    progress.line("=========================================\n");

    if let Err(e) = run(parsed) {
        eprintln!("\n❌ Correction failed: {}\n", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(flags: &[&str]) -> Vec<String> {
        std::iter::once("flowprop")
            .chain(flags.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_progress_moves_to_stderr_when_results_go_to_stdout() {
        let piped = parse_args(&argv(&["--sim-gauge", "s.csv", "--target", "t.csv"])).unwrap();
        assert!(Progress::for_args(&piped).to_stderr, "stdout carries the CSV");

        let to_file = parse_args(&argv(&["--output", "out.csv", "--json"])).unwrap();
        assert!(to_file.json);
        assert!(!Progress::for_args(&to_file).to_stderr);
    }

    #[test]
    fn test_parse_args_rejects_unknown_flag_and_missing_value() {
        assert!(parse_args(&argv(&["--bogus", "x"])).is_err());
        assert!(parse_args(&argv(&["--target"])).is_err());
    }
}
