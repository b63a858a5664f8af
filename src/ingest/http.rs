/// Gauge records published as CSV over HTTP.
///
/// The IDEAM observed discharge archive is a
/// HydroShare resource with one CSV per station:
///   https://www.hydroshare.org/resource/<resource>/data/contents/Discharge_Data/<id>.csv
/// Any other URL serving the same two-column layout works as well.

use std::time::Duration;

use crate::ingest::csv::parse_flow_csv;
use crate::ingest::{FlowSource, SourceError};
use crate::model::FlowSeries;

const HYDROSHARE_BASE: &str = "https://www.hydroshare.org/resource";

/// Resource holding the IDEAM discharge records.
pub const IDEAM_DISCHARGE_RESOURCE: &str = "d222676fbd984a81911761ca1ba936bf";

const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Builds the download URL of one station CSV in a HydroShare resource.
pub fn build_hydroshare_url(resource: &str, station_id: &str) -> String {
    format!(
        "{}/{}/data/contents/Discharge_Data/{}.csv",
        HYDROSHARE_BASE,
        resource,
        urlencoding::encode(station_id)
    )
}

/// A flow CSV fetched with a blocking GET.
#[derive(Debug, Clone)]
pub struct HttpCsvSource {
    pub url: String,
}

impl HttpCsvSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Observed discharge for an IDEAM station id.
    pub fn ideam_station(station_id: &str) -> Self {
        Self::new(build_hydroshare_url(IDEAM_DISCHARGE_RESOURCE, station_id))
    }

    fn fetch_text(&self) -> Result<String, SourceError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        tracing::debug!(url = %self.url, "fetching flow CSV");
        let text = client.get(&self.url).send()?.error_for_status()?.text()?;
        Ok(text)
    }
}

impl FlowSource for HttpCsvSource {
    fn describe(&self) -> String {
        format!("csv at {}", self.url)
    }

    fn load(&self) -> Result<FlowSeries, SourceError> {
        let text = self.fetch_text()?;
        parse_flow_csv(&text)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
