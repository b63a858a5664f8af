/// Test fixtures: representative payloads for the flow collaborators.
///
/// CSV fixtures mirror the two exports the correction consumes: simulated
/// flow (hydrology model, ISO timestamps with time of day) and observed
/// gauge flow (date-only index, gaps left as empty cells or `nan`).
///
/// The JSON fixtures follow the USGS Daily Values envelope:
///   response.value.timeSeries[]
///     .sourceInfo.siteCode[0].value   - site number (string)
///     .variable.variableCode[0].value - parameter code (00060 discharge)
///     .variable.noDataValue           - sentinel for missing data (-999999)
///     .values[0].value[]
///       .value     - the measurement as a STRING
///       .dateTime  - local date, no offset
///       .qualifiers[]

/// Five days of simulated flow with a header row.
pub(crate) fn fixture_simulated_csv() -> &'static str {
    "datetime,flow\n\
     2015-01-01 00:00:00,120.5\n\
     2015-01-02 00:00:00,118.0\n\
     2015-01-03 00:00:00,131.7\n\
     2015-01-04 00:00:00,135.0\n\
     2015-01-05 00:00:00,140.2\n"
}

/// Observed gauge flow with one empty cell and one `nan` token.
pub(crate) fn fixture_observed_csv_with_gaps() -> &'static str {
    "# Discharge_Data export\n\
     Date,Streamflow (m3/s)\n\
     2015-01-01,98.1\n\
     2015-01-02,\n\
     2015-01-03,104.4\n\
     2015-01-04,nan\n\
     2015-01-05,110.0\n"
}

/// DV discharge for one site, three days, middle day is the sentinel.
pub(crate) fn fixture_dv_discharge_json() -> &'static str {
    r#"{
      "value": {
        "timeSeries": [{
          "sourceInfo": {
            "siteName": "Illinois River at Kingston Mines, IL",
            "siteCode": [{ "value": "05568500", "network": "NWIS", "agencyCode": "USGS" }]
          },
          "variable": {
            "variableCode": [{ "value": "00060", "network": "NWIS" }],
            "variableName": "Streamflow, ft&#179;/s",
            "unit": { "unitCode": "ft3/s" },
            "noDataValue": -999999.0
          },
          "values": [{
            "value": [
              { "value": "41200", "qualifiers": ["A"], "dateTime": "2020-04-01T00:00:00.000" },
              { "value": "-999999", "qualifiers": ["A", "Ice"], "dateTime": "2020-04-02T00:00:00.000" },
              { "value": "43850", "qualifiers": ["P"], "dateTime": "2020-04-03T00:00:00.000" }
            ]
          }]
        }]
      }
    }"#
}

/// DV response where the discharge series carries only sentinel values.
pub(crate) fn fixture_dv_all_sentinel_json() -> &'static str {
    r#"{
      "value": {
        "timeSeries": [{
          "sourceInfo": {
            "siteName": "Spoon River at Seville, IL",
            "siteCode": [{ "value": "05570000", "network": "NWIS", "agencyCode": "USGS" }]
          },
          "variable": {
            "variableCode": [{ "value": "00060", "network": "NWIS" }],
            "variableName": "Streamflow, ft&#179;/s",
            "unit": { "unitCode": "ft3/s" },
            "noDataValue": -999999.0
          },
          "values": [{
            "value": [
              { "value": "-999999", "qualifiers": ["Eqp"], "dateTime": "2020-04-01T00:00:00.000" }
            ]
          }]
        }]
      }
    }"#
}

/// DV response holding a stage series only (no discharge).
pub(crate) fn fixture_dv_stage_only_json() -> &'static str {
    r#"{
      "value": {
        "timeSeries": [{
          "sourceInfo": {
            "siteName": "Illinois River at Peoria, IL",
            "siteCode": [{ "value": "05567500", "network": "NWIS", "agencyCode": "USGS" }]
          },
          "variable": {
            "variableCode": [{ "value": "00065", "network": "NWIS" }],
            "variableName": "Gage height, ft",
            "unit": { "unitCode": "ft" },
            "noDataValue": -999999.0
          },
          "values": [{
            "value": [
              { "value": "14.85", "qualifiers": ["P"], "dateTime": "2020-04-01T00:00:00.000" }
            ]
          }]
        }]
      }
    }"#
}

/// Small drainage network: two first-order reaches join a second-order
/// stem that drains to a third-order outlet.
///
///   101 ─┐
///        ├─ 201 ─ 202 ─ 301 (outlet)
///   102 ─┘
pub(crate) fn fixture_network_csv() -> &'static str {
    "COMID,NextDownID,order_\n\
     101,201,1\n\
     102,201,1\n\
     201,202,2\n\
     202,301,2\n\
     301,-1,3\n"
}
