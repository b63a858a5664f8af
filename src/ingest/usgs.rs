/// USGS NWIS Daily Values (DV) discharge client.
///
/// Handles URL construction and JSON response parsing for the USGS Water
/// Services DV endpoint:
///   https://waterservices.usgs.gov/nwis/dv/
///
/// The DV service returns WaterML rendered as JSON. See `fixtures.rs` for
/// annotated examples of the response structure. Only the daily mean
/// discharge series (`00060`) is turned into a `FlowSeries`; sentinel
/// values stay in the series as missing values so that gaps remain
/// visible until `dropna`.

use chrono::NaiveDate;
use serde::Deserialize;

use crate::ingest::csv::parse_timestamp;
use crate::ingest::{FlowSource, SourceError};
use crate::model::{FlowPoint, FlowSeries};

/// USGS parameter code for discharge (ft³/s).
pub const PARAM_DISCHARGE: &str = "00060";

const DV_BASE_URL: &str = "https://waterservices.usgs.gov/nwis/dv/";

// ---------------------------------------------------------------------------
// Serde structures for WaterML JSON deserialization
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct DvResponse {
    value: ValueWrapper,
}

#[derive(Deserialize)]
struct ValueWrapper {
    #[serde(rename = "timeSeries")]
    time_series: Vec<TimeSeries>,
}

#[derive(Deserialize)]
struct TimeSeries {
    #[serde(rename = "sourceInfo")]
    source_info: SourceInfo,
    variable: Variable,
    values: Vec<Values>,
}

#[derive(Deserialize)]
struct SourceInfo {
    #[serde(rename = "siteCode")]
    site_code: Vec<SiteCode>,
}

#[derive(Deserialize)]
struct SiteCode {
    value: String,
}

#[derive(Deserialize)]
struct Variable {
    #[serde(rename = "variableCode")]
    variable_code: Vec<VariableCode>,
    #[serde(rename = "noDataValue")]
    no_data_value: f64,
}

#[derive(Deserialize)]
struct VariableCode {
    value: String,
}

#[derive(Deserialize)]
struct Values {
    value: Vec<ValueEntry>,
}

#[derive(Deserialize)]
struct ValueEntry {
    value: String, // USGS returns as string!
    #[serde(rename = "dateTime")]
    date_time: String,
}

// ---------------------------------------------------------------------------
// URL construction
// ---------------------------------------------------------------------------

/// Builds a DV discharge URL for one site and an inclusive date range.
///
/// # Example
/// ```
/// use chrono::NaiveDate;
/// use flowprop::ingest::usgs::build_dv_url;
///
/// let url = build_dv_url(
///     "05568500",
///     NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
///     NaiveDate::from_ymd_opt(2020, 12, 31).unwrap(),
/// );
/// assert!(url.contains("startDT=2020-01-01"));
/// ```
pub fn build_dv_url(site: &str, start: NaiveDate, end: NaiveDate) -> String {
    format!(
        "{}?sites={}&parameterCd={}&startDT={}&endDT={}&statCd=00003&format=json",
        DV_BASE_URL,
        urlencoding::encode(site),
        PARAM_DISCHARGE,
        start.format("%Y-%m-%d"),
        end.format("%Y-%m-%d")
    )
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

/// Parses a DV JSON body into the discharge record of `site`.
///
/// # Errors
/// - `SourceError::Parse` - malformed JSON, unexpected structure, or an
///   unreadable date.
/// - `SourceError::NoData` - no discharge series for the site, or a
///   series holding only sentinel values.
/// - `SourceError::Invalid` - the values do not form a valid flow series.
pub fn parse_dv_discharge(json: &str, site: &str) -> Result<FlowSeries, SourceError> {
    let response: DvResponse = serde_json::from_str(json)
        .map_err(|e| SourceError::Parse(format!("JSON deserialization failed: {}", e)))?;

    for series in response.value.time_series {
        let site_code = series
            .source_info
            .site_code
            .first()
            .ok_or_else(|| SourceError::Parse("Missing siteCode".to_string()))?
            .value
            .clone();
        let parameter_code = series
            .variable
            .variable_code
            .first()
            .ok_or_else(|| SourceError::Parse("Missing variableCode".to_string()))?
            .value
            .clone();

        if site_code != site || parameter_code != PARAM_DISCHARGE {
            continue;
        }

        let no_data_value = series.variable.no_data_value;
        let values_wrapper = series
            .values
            .first()
            .ok_or_else(|| SourceError::Parse("Missing values array".to_string()))?;

        let mut points = Vec::with_capacity(values_wrapper.value.len());
        let mut valid = 0usize;

        for entry in &values_wrapper.value {
            let timestamp = parse_timestamp(&entry.date_time).ok_or_else(|| {
                SourceError::Parse(format!("Unreadable dateTime '{}'", entry.date_time))
            })?;

            let flow = match entry.value.parse::<f64>() {
                Ok(v) if (v - no_data_value).abs() < 0.1 => f64::NAN,
                Ok(v) => {
                    valid += 1;
                    v
                }
                Err(e) => {
                    tracing::warn!(
                        site,
                        value = %entry.value,
                        error = %e,
                        "unparseable daily value, treating as missing"
                    );
                    f64::NAN
                }
            };
            points.push(FlowPoint { timestamp, flow });
        }

        if valid == 0 {
            return Err(SourceError::NoData(format!(
                "discharge series for {} has no valid values",
                site
            )));
        }
        return Ok(FlowSeries::new(points)?);
    }

    Err(SourceError::NoData(format!(
        "no {} series for site {} in response",
        PARAM_DISCHARGE, site
    )))
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

/// Observed daily mean discharge of a USGS site.
#[derive(Debug, Clone)]
pub struct UsgsDailySource {
    pub site: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl UsgsDailySource {
    pub fn new(site: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            site: site.into(),
            start,
            end,
        }
    }

    pub fn url(&self) -> String {
        build_dv_url(&self.site, self.start, self.end)
    }
}

impl FlowSource for UsgsDailySource {
    fn describe(&self) -> String {
        format!("USGS {} daily discharge {}..{}", self.site, self.start, self.end)
    }

    fn load(&self) -> Result<FlowSeries, SourceError> {
        if self.start > self.end {
            return Err(SourceError::Parse(format!(
                "start date {} is after end date {}",
                self.start, self.end
            )));
        }
        let url = self.url();
        tracing::debug!(%url, "fetching USGS daily values");
        let body = reqwest::blocking::get(&url)?.error_for_status()?.text()?;
        parse_dv_discharge(&body, &self.site)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::fixtures::*;
    use chrono::{TimeZone, Utc};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // --- URL construction ---------------------------------------------------

    #[test]
    fn test_build_dv_url_targets_dv_endpoint() {
        let url = build_dv_url("05568500", date(2020, 1, 1), date(2020, 12, 31));
        assert!(
            url.contains("waterservices.usgs.gov/nwis/dv/"),
            "must target the DV endpoint, got: {}",
            url
        );
        assert!(url.contains("format=json"), "must request JSON format");
        assert!(url.contains("parameterCd=00060"), "must request discharge");
    }

    #[test]
    fn test_build_dv_url_includes_date_range() {
        let url = build_dv_url("05568500", date(1939, 10, 1), date(1940, 9, 30));
        assert!(url.contains("startDT=1939-10-01"), "must include start date");
        assert!(url.contains("endDT=1940-09-30"), "must include end date");
        assert!(url.contains("sites=05568500"), "must include site code");
    }

    // --- Parsing ------------------------------------------------------------

    #[test]
    fn test_parse_dv_discharge_keeps_sentinel_as_missing() {
        let series = parse_dv_discharge(fixture_dv_discharge_json(), "05568500")
            .expect("valid fixture should parse");

        assert_eq!(series.len(), 3, "sentinel day stays in the record");
        let values = series.values();
        assert!((values[0] - 41_200.0).abs() < 0.01);
        assert!(values[1].is_nan(), "sentinel -999999 must become missing");
        assert!((values[2] - 43_850.0).abs() < 0.01);
        assert_eq!(
            series.points()[2].timestamp,
            Utc.with_ymd_and_hms(2020, 4, 3, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_dv_all_sentinel_is_no_data() {
        let result = parse_dv_discharge(fixture_dv_all_sentinel_json(), "05570000");
        assert!(
            matches!(result, Err(SourceError::NoData(_))),
            "only sentinel values should yield NoData, got {:?}",
            result
        );
    }

    #[test]
    fn test_parse_dv_without_discharge_is_no_data() {
        let result = parse_dv_discharge(fixture_dv_stage_only_json(), "05567500");
        assert!(matches!(result, Err(SourceError::NoData(_))));
    }

    #[test]
    fn test_parse_dv_other_site_is_no_data() {
        let result = parse_dv_discharge(fixture_dv_discharge_json(), "05567500");
        assert!(matches!(result, Err(SourceError::NoData(_))));
    }

    #[test]
    fn test_parse_malformed_json_returns_parse_error() {
        let result = parse_dv_discharge("{ this is not valid json }}}", "05568500");
        assert!(
            matches!(result, Err(SourceError::Parse(_))),
            "malformed JSON should return Parse, got {:?}",
            result
        );
    }

    #[test]
    fn test_parse_empty_time_series_array_returns_no_data() {
        let json = r#"{ "value": { "timeSeries": [] } }"#;
        let result = parse_dv_discharge(json, "05568500");
        assert!(matches!(result, Err(SourceError::NoData(_))));
    }

    #[test]
    fn test_inverted_date_range_rejected_before_fetch() {
        let source = UsgsDailySource::new("05568500", date(2021, 1, 1), date(2020, 1, 1));
        assert!(matches!(source.load(), Err(SourceError::Parse(_))));
    }

    #[test]
    #[ignore] // network access
    fn test_fetch_live_kingston_mines() {
        let source = UsgsDailySource::new("05568500", date(2020, 4, 1), date(2020, 4, 30));
        let series = source.load().expect("live DV request should succeed");
        assert_eq!(series.len(), 30);
    }
}
