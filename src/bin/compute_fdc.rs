//! Flow-duration curve export.
//!
//! Reads a flow CSV and writes its flow-duration curve as
//! `<probability label>,flow` rows, one per grid percentile.
//!
//! Usage:
//!   compute_fdc flows.csv                          # exceedance curve to stdout
//!   compute_fdc flows.csv --steps 100 --output fdc.csv
//!   compute_fdc flows.csv --non-exceedance

use flowprop::analysis::fdc::{DEFAULT_PROB_STEPS, flow_duration_curve};
use flowprop::ingest::csv::{format_fdc_csv, read_flow_csv, write_fdc_csv};

use std::env;

fn run(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let mut input: Option<&str> = None;
    let mut output: Option<&str> = None;
    let mut steps = DEFAULT_PROB_STEPS;
    let mut exceedance = true;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--steps" => {
                let value = args.get(i + 1).ok_or("--steps requires a number")?;
                steps = value
                    .parse()
                    .map_err(|e| format!("--steps '{}' is not a number: {}", value, e))?;
                i += 2;
            }
            "--output" => {
                output = Some(args.get(i + 1).map(String::as_str).ok_or("--output requires a path")?);
                i += 2;
            }
            "--non-exceedance" => {
                exceedance = false;
                i += 1;
            }
            other if other.starts_with("--") => {
                return Err(format!("Unknown argument: {}", other).into());
            }
            path => {
                input = Some(path);
                i += 1;
            }
        }
    }

    let input = input.ok_or("an input CSV is required")?;
    let series = read_flow_csv(input)?;
    tracing::info!(path = input, values = series.len(), "loaded flow series");

    let curve = flow_duration_curve(&series.values(), steps, exceedance)?;

    match output {
        Some(path) => {
            write_fdc_csv(path, &curve)?;
            println!("✅ Wrote {} FDC points to {}", curve.len(), path);
        }
        None => print!("{}", format_fdc_csv(&curve)),
    }
    Ok(())
}

fn main() {
    flowprop::init_logging();

    let args: Vec<String> = env::args().collect();
    if let Err(e) = run(&args) {
        eprintln!("❌ {}", e);
        eprintln!(
            "Usage: {} FLOWS.csv [--steps N] [--non-exceedance] [--output PATH]",
            args.first().map(String::as_str).unwrap_or("compute_fdc")
        );
        std::process::exit(1);
    }
}
