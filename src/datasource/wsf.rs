//! Washington State Ferries vessel-locations feed.

use super::{DataSourceError, SnapshotSource};
use crate::domain::{Terminal, TerminalId, TimeMs, VesselId, VesselSnapshot};
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Vessel-locations client for the WSF Vessels REST API.
#[derive(Debug, Clone)]
pub struct WsfDataSource {
    client: Client,
    base_url: String,
    access_code: String,
    max_elapsed: Duration,
}

impl WsfDataSource {
    pub fn new(base_url: String, access_code: String, max_elapsed: Duration) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            access_code,
            max_elapsed,
        }
    }

    async fn get_json(&self, path: &str) -> Result<Value, DataSourceError> {
        let url = format!("{}/{}", self.base_url, path);
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(self.max_elapsed),
            ..Default::default()
        };

        retry(backoff, || async {
            let response = self
                .client
                .get(&url)
                .query(&[("apiaccesscode", self.access_code.as_str())])
                .send()
                .await
                .map_err(|e| {
                    backoff::Error::transient(DataSourceError::NetworkError(e.to_string()))
                })?;

            let status = response.status();
            if status == 429 {
                return Err(backoff::Error::transient(DataSourceError::RateLimited));
            }
            if status.is_server_error() {
                return Err(backoff::Error::transient(DataSourceError::HttpError {
                    status: status.as_u16(),
                    message: "Server error".to_string(),
                }));
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(DataSourceError::HttpError {
                    status: status.as_u16(),
                    message: "Client error".to_string(),
                }));
            }

            response
                .json::<Value>()
                .await
                .map_err(|e| backoff::Error::permanent(DataSourceError::ParseError(e.to_string())))
        })
        .await
    }
}

#[async_trait]
impl SnapshotSource for WsfDataSource {
    async fn fetch_snapshots(&self) -> Result<Vec<VesselSnapshot>, DataSourceError> {
        debug!("Fetching vessel locations from {}", self.base_url);

        let response = self.get_json("vessellocations").await?;
        let records = response
            .as_array()
            .ok_or_else(|| DataSourceError::ParseError("Expected array response".to_string()))?;

        let mut snapshots = Vec::with_capacity(records.len());
        for record in records {
            match parse_vessel_location(record) {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(e) => {
                    warn!("Dropping vessel location record: {}", e);
                }
            }
        }

        Ok(snapshots)
    }
}

/// Parse a feed date of the form `/Date(1692487800000-0700)/`.
///
/// The millisecond value is already UTC; the offset suffix is ignored.
pub fn parse_wsf_date(raw: &str) -> Option<TimeMs> {
    let inner = raw.trim().strip_prefix("/Date(")?.strip_suffix(")/")?;
    let digits_end = inner
        .char_indices()
        .skip(1)
        .find(|(_, c)| *c == '+' || *c == '-')
        .map(|(i, _)| i)
        .unwrap_or(inner.len());
    inner[..digits_end].parse::<i64>().ok().map(TimeMs::new)
}

fn date_field(json: &Value, field: &str) -> Option<TimeMs> {
    json.get(field).and_then(Value::as_str).and_then(parse_wsf_date)
}

fn string_field(json: &Value, field: &str) -> Option<String> {
    json.get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_vessel_location(json: &Value) -> Result<VesselSnapshot, DataSourceError> {
    let vessel_id = json
        .get("VesselID")
        .and_then(Value::as_i64)
        .ok_or_else(|| DataSourceError::ParseError("Missing VesselID field".to_string()))?;

    let vessel_name = string_field(json, "VesselName").unwrap_or_default();

    let departing_id = json
        .get("DepartingTerminalID")
        .and_then(Value::as_i64)
        .ok_or_else(|| {
            DataSourceError::ParseError(format!(
                "Missing DepartingTerminalID for vessel {}",
                vessel_id
            ))
        })?;
    let departing_terminal = Terminal {
        id: TerminalId::new(departing_id),
        name: string_field(json, "DepartingTerminalName").unwrap_or_default(),
        abbrev: string_field(json, "DepartingTerminalAbbrev"),
    };

    let arriving_terminal = json
        .get("ArrivingTerminalID")
        .and_then(Value::as_i64)
        .map(|id| Terminal {
            id: TerminalId::new(id),
            name: string_field(json, "ArrivingTerminalName").unwrap_or_default(),
            abbrev: string_field(json, "ArrivingTerminalAbbrev"),
        });

    let timestamp = date_field(json, "TimeStamp").ok_or_else(|| {
        DataSourceError::ParseError(format!("Missing or invalid TimeStamp for vessel {}", vessel_id))
    })?;

    let route_abbrev = json
        .get("OpRouteAbbrev")
        .and_then(Value::as_array)
        .and_then(|routes| routes.first())
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(VesselSnapshot {
        vessel_id: VesselId::new(vessel_id),
        vessel_name,
        vessel_abbrev: string_field(json, "VesselAbbrev"),
        departing_terminal,
        arriving_terminal,
        in_service: json.get("InService").and_then(Value::as_bool).unwrap_or(false),
        at_dock: json.get("AtDock").and_then(Value::as_bool).unwrap_or(false),
        scheduled_departure: date_field(json, "ScheduledDeparture"),
        left_dock: date_field(json, "LeftDock"),
        actual_left_dock: None,
        eta: date_field(json, "Eta"),
        actual_arrival: None,
        route_abbrev,
        position_num: json
            .get("VesselPositionNum")
            .and_then(Value::as_i64)
            .and_then(|n| i32::try_from(n).ok()),
        timestamp,
    })
}
