/// Flow data collaborators.
///
/// Every source of a `FlowSeries` implements `FlowSource`, so the
/// correction pipeline never cares whether a record came from a local CSV,
/// a CSV served over HTTP, or the USGS Daily Values service.
///
/// Submodules:
/// - `csv`      - CSV parsing and the corrected/FDC CSV writers.
/// - `http`     - gauge CSV downloaded over HTTP.
/// - `usgs`     - USGS NWIS Daily Values discharge client.
/// - `fixtures` - representative payloads (test only).

pub mod csv;
pub mod http;
pub mod usgs;

#[cfg(test)]
pub(crate) mod fixtures;

use crate::model::{CorrectionError, FlowSeries};

/// Anything that can produce a flow record.
pub trait FlowSource {
    /// Short description used in log lines and error messages.
    fn describe(&self) -> String;

    fn load(&self) -> Result<FlowSeries, SourceError>;
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors raised while loading a flow record.
#[derive(Debug)]
pub enum SourceError {
    /// Local file could not be read or written.
    Io { path: String, source: std::io::Error },
    /// Transport failure or non-success HTTP status.
    Http(String),
    /// Payload did not have the expected shape.
    Parse(String),
    /// Payload parsed but held no usable values.
    NoData(String),
    /// Parsed values did not form a valid flow series.
    Invalid(CorrectionError),
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::Io { path, source } => write!(f, "I/O error on {}: {}", path, source),
            SourceError::Http(msg) => write!(f, "HTTP error: {}", msg),
            SourceError::Parse(msg) => write!(f, "Parse error: {}", msg),
            SourceError::NoData(msg) => write!(f, "No data available: {}", msg),
            SourceError::Invalid(e) => write!(f, "Invalid flow series: {}", e),
        }
    }
}

impl std::error::Error for SourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SourceError::Io { source, .. } => Some(source),
            SourceError::Invalid(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CorrectionError> for SourceError {
    fn from(e: CorrectionError) -> Self {
        SourceError::Invalid(e)
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        SourceError::Http(e.to_string())
    }
}
