/// Integration tests for the bias-correction pipeline
///
/// These tests verify:
/// 1. CSV → FlowSeries → propagate → CSV round trip through the public API
/// 2. correction.toml options reach the pipeline unchanged
/// 3. Seasonal runs report skipped groups without failing
/// 4. File-backed sources and writers agree with the in-memory path
///
/// Run with: cargo test --test propagation_integration

use flowprop::analysis::fdc::flow_duration_curve;
use flowprop::analysis::propagate_correction;
use flowprop::config::{CorrectionConfig, load_config, parse_config};
use flowprop::ingest::csv::{CsvFileSource, format_corrected_csv, parse_flow_csv, write_corrected_csv, write_fdc_csv};
use flowprop::ingest::FlowSource;
use flowprop::model::{CorrectionError, FlowSeries};
use flowprop::network::StreamNetwork;

use chrono::{Datelike, Duration, NaiveDate};
use std::fs;
use std::path::PathBuf;

/// Daily CSV for 2012 (leap year) with a seasonal flow shape.
fn seasonal_csv(scale: f64, first_month: u32, last_month: u32) -> String {
    let mut out = String::from("datetime,flow\n");
    let mut day = NaiveDate::from_ymd_opt(2012, 1, 1).unwrap();
    let mut i = 0usize;
    while day.year() == 2012 {
        if (first_month..=last_month).contains(&day.month()) {
            let seasonal = 100.0 + 60.0 * ((day.ordinal() as f64) / 58.0).sin();
            let noise = ((i * 53) % 17) as f64;
            out.push_str(&format!("{},{:.3}\n", day.format("%Y-%m-%d"), (seasonal + noise) * scale));
        }
        day += Duration::days(1);
        i += 1;
    }
    out
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("flowprop_{}_{}", name, std::process::id()));
    fs::create_dir_all(&dir).expect("temp dir should be writable");
    dir
}

#[test]
fn test_csv_to_corrected_csv_monthly() {
    let sim = parse_flow_csv(&seasonal_csv(1.0, 1, 12)).expect("sim CSV parses");
    let obs = parse_flow_csv(&seasonal_csv(0.8, 1, 12)).expect("obs CSV parses");
    let target = parse_flow_csv(&seasonal_csv(2.5, 1, 12)).expect("target CSV parses");

    let config = parse_config("[correction]\nextrapolation = \"nearest\"\n", "inline").unwrap();
    let corrected = propagate_correction(&sim, &obs, &target, &config).expect("should correct");

    assert_eq!(corrected.len(), 366, "one output row per target day");
    assert!(corrected.skipped.is_empty(), "every month has gauge and target data");
    for point in &corrected.points {
        assert!(
            (point.scalar - 0.8).abs() < 1e-3,
            "obs = 0.8 × sim, so the scalar is 0.8 (got {} at {})",
            point.scalar,
            point.timestamp
        );
    }

    let csv = format_corrected_csv(&corrected);
    let reparsed = parse_flow_csv(&csv).expect("output CSV is a flow CSV");
    assert_eq!(reparsed.len(), 366);
    assert!(
        reparsed.points().windows(2).all(|w| w[0].timestamp < w[1].timestamp),
        "output must be chronological"
    );
}

#[test]
fn test_gauge_limited_to_summer_outputs_summer_only() {
    let sim = parse_flow_csv(&seasonal_csv(1.0, 6, 8)).unwrap();
    let obs = parse_flow_csv(&seasonal_csv(1.2, 6, 8)).unwrap();
    let target = parse_flow_csv(&seasonal_csv(3.0, 1, 12)).unwrap();

    let corrected = propagate_correction(&sim, &obs, &target, &CorrectionConfig::default()).unwrap();

    assert_eq!(corrected.len(), 30 + 31 + 31);
    assert!(corrected
        .points
        .iter()
        .all(|p| (6..=8).contains(&p.timestamp.month())));
}

#[test]
fn test_custom_groups_report_empty_group() {
    let sim = parse_flow_csv(&seasonal_csv(1.0, 1, 6)).unwrap();
    let obs = parse_flow_csv(&seasonal_csv(1.1, 1, 6)).unwrap();
    let target = parse_flow_csv(&seasonal_csv(2.0, 1, 12)).unwrap();

    let config = parse_config(
        "[correction]\nseasonality = [[12, 1, 2], [3, 4, 5], [9, 10, 11]]\n",
        "inline",
    )
    .expect("month groups parse");
    let corrected = propagate_correction(&sim, &obs, &target, &config).unwrap();

    // Winter uses Jan+Feb gauge data against Jan, Feb and Dec target days.
    let winter = corrected
        .points
        .iter()
        .filter(|p| [12, 1, 2].contains(&p.timestamp.month()))
        .count();
    assert_eq!(winter, 31 + 29 + 31);
    assert_eq!(corrected.skipped.len(), 1, "autumn has no gauge data");
    assert_eq!(corrected.skipped[0].group, "months 9,10,11");
}

#[test]
fn test_non_seasonal_gumbel_records_single_fit() {
    let sim = parse_flow_csv(&seasonal_csv(1.0, 1, 12)).unwrap();
    let obs = parse_flow_csv(&seasonal_csv(1.05, 1, 12)).unwrap();
    let target = parse_flow_csv(&seasonal_csv(0.5, 1, 12)).unwrap();

    let config = parse_config(
        "[correction]\nseasonal = false\nfit_gumbel = true\ngumbel_trusted_range = [20, 80]\n",
        "inline",
    )
    .unwrap();
    let corrected = propagate_correction(&sim, &obs, &target, &config).unwrap();

    assert_eq!(corrected.gumbel_fits.len(), 1);
    assert_eq!(corrected.gumbel_fits[0].0, "full record");
    assert!(corrected.gumbel_fits[0].1.std > 0.0);
}

#[test]
fn test_missing_observed_data_is_fatal() {
    let sim = parse_flow_csv(&seasonal_csv(1.0, 1, 12)).unwrap();
    let obs = parse_flow_csv("datetime,flow\n2012-01-01,\n2012-01-02,nan\n").unwrap();

    let result = propagate_correction(&sim, &obs, &sim, &CorrectionConfig::default());
    assert!(
        matches!(result, Err(CorrectionError::InvalidInput(_))),
        "an all-missing gauge record cannot be corrected against, got {:?}",
        result
    );
}

#[test]
fn test_file_sources_and_writers() {
    let dir = scratch_dir("files");
    let sim_path = dir.join("sim.csv");
    let obs_path = dir.join("obs.csv");
    let config_path = dir.join("correction.toml");
    fs::write(&sim_path, seasonal_csv(1.0, 1, 12)).unwrap();
    fs::write(&obs_path, seasonal_csv(0.9, 1, 12)).unwrap();
    fs::write(&config_path, "[correction]\nseasonal = false\nextrapolation = \"min\"\n").unwrap();

    let sim: FlowSeries = CsvFileSource::new(&sim_path).load().expect("sim file loads");
    let obs = CsvFileSource::new(&obs_path).load().expect("obs file loads");
    let config = load_config(&config_path).expect("config file loads");
    assert!(!config.seasonal);

    let corrected = propagate_correction(&sim, &obs, &sim, &config).unwrap();
    let out_path = dir.join("corrected.csv");
    write_corrected_csv(&out_path, &corrected).unwrap();
    let written = fs::read_to_string(&out_path).unwrap();
    assert!(written.starts_with("datetime,corrected_flow,scalar,percentile\n"));
    assert_eq!(written.lines().count(), 367, "header plus one row per day");

    let fdc = flow_duration_curve(&sim.values(), 100, true).unwrap();
    let fdc_path = dir.join("fdc.csv");
    write_fdc_csv(&fdc_path, &fdc).unwrap();
    assert_eq!(fs::read_to_string(&fdc_path).unwrap().lines().count(), 102);

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_network_lists_propagation_targets() {
    let text = "COMID,NextDownID,order_\n\
                9007781,9007800,4\n\
                9007800,9007812,4\n\
                9007812,9007900,5\n\
                9007900,-1,5\n";
    let network = StreamNetwork::from_csv(text).expect("network parses");

    assert_eq!(
        network.downstream_ids(9007781, true).unwrap(),
        vec![9007800, 9007812]
    );
    assert_eq!(
        network.downstream_ids(9007781, false).unwrap(),
        vec![9007800, 9007812, 9007900]
    );
}
