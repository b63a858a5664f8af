/// Flow CSV parsing and export.
///
/// Input layout: first column a timestamp, second column the flow. Lines
/// starting with `#` and blank lines are skipped. A header row is optional
/// and recognized by a first cell that is not a timestamp. Empty cells and
/// `nan`/`NA` tokens are missing values.
///
/// Accepted timestamp formats:
///   2015-03-01T06:00:00Z         (RFC 3339)
///   2015-03-01 06:00:00+00:00
///   2015-03-01 06:00:00          (taken as UTC)
///   2015-03-01                   (midnight UTC)

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::analysis::fdc::FlowDurationCurve;
use crate::ingest::{FlowSource, SourceError};
use crate::model::{CorrectedFlowSeries, FlowPoint, FlowSeries};

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parses a timestamp cell in any of the accepted formats.
pub fn parse_timestamp(cell: &str) -> Option<DateTime<Utc>> {
    let cell = cell.trim().trim_matches('"');

    if let Ok(dt) = DateTime::parse_from_rfc3339(cell) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(cell, "%Y-%m-%d %H:%M:%S%:z") {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(cell, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(cell, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn parse_flow_cell(cell: &str, line_no: usize) -> Result<f64, SourceError> {
    let cell = cell.trim().trim_matches('"');
    match cell.to_ascii_lowercase().as_str() {
        "" | "nan" | "na" | "null" => Ok(f64::NAN),
        _ => cell.parse::<f64>().map_err(|e| {
            SourceError::Parse(format!("line {}: bad flow value '{}': {}", line_no, cell, e))
        }),
    }
}

/// Parses CSV text into a `FlowSeries`.
///
/// # Errors
/// - `SourceError::Parse` - a row is missing its flow column, has an
///   unreadable timestamp, or a non-numeric flow.
/// - `SourceError::NoData` - no data rows.
/// - `SourceError::Invalid` - duplicate timestamps or impossible flows.
pub fn parse_flow_csv(text: &str) -> Result<FlowSeries, SourceError> {
    let mut points = Vec::new();
    let mut seen_first = false;

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = trimmed.split(',').collect();
        let first_row = !seen_first;
        seen_first = true;

        let Some(timestamp) = parse_timestamp(fields[0]) else {
            if first_row {
                continue; // header
            }
            return Err(SourceError::Parse(format!(
                "line {}: unreadable timestamp '{}'",
                line_no, fields[0]
            )));
        };

        let cell = fields.get(1).ok_or_else(|| {
            SourceError::Parse(format!("line {}: missing flow column", line_no))
        })?;
        let flow = parse_flow_cell(cell, line_no)?;

        points.push(FlowPoint { timestamp, flow });
    }

    if points.is_empty() {
        return Err(SourceError::NoData("CSV contained no data rows".to_string()));
    }

    Ok(FlowSeries::new(points)?)
}

/// Reads and parses a flow CSV file.
pub fn read_flow_csv(path: impl AsRef<Path>) -> Result<FlowSeries, SourceError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| SourceError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_flow_csv(&text)
}

/// A flow record stored as a local CSV file.
#[derive(Debug, Clone)]
pub struct CsvFileSource {
    pub path: PathBuf,
}

impl CsvFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FlowSource for CsvFileSource {
    fn describe(&self) -> String {
        format!("csv file {}", self.path.display())
    }

    fn load(&self) -> Result<FlowSeries, SourceError> {
        read_flow_csv(&self.path)
    }
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Renders the corrected series as `datetime,corrected_flow,scalar,percentile`.
pub fn format_corrected_csv(series: &CorrectedFlowSeries) -> String {
    let mut out = String::from("datetime,corrected_flow,scalar,percentile\n");
    for p in &series.points {
        out.push_str(&format!(
            "{},{},{},{}\n",
            p.timestamp.format("%Y-%m-%dT%H:%M:%SZ"),
            p.corrected_flow,
            p.scalar,
            p.percentile
        ));
    }
    out
}

/// Renders a flow-duration curve with its probability label as header.
pub fn format_fdc_csv(curve: &FlowDurationCurve) -> String {
    let mut out = format!("{},flow\n", curve.probability_label());
    for p in &curve.points {
        out.push_str(&format!("{},{}\n", p.percentile, p.flow));
    }
    out
}

fn write_text(path: &Path, text: &str) -> Result<(), SourceError> {
    fs::write(path, text).map_err(|source| SourceError::Io {
        path: path.display().to_string(),
        source,
    })
}

pub fn write_corrected_csv(
    path: impl AsRef<Path>,
    series: &CorrectedFlowSeries,
) -> Result<(), SourceError> {
    write_text(path.as_ref(), &format_corrected_csv(series))
}

pub fn write_fdc_csv(path: impl AsRef<Path>, curve: &FlowDurationCurve) -> Result<(), SourceError> {
    write_text(path.as_ref(), &format_fdc_csv(curve))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
