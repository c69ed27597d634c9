//! Query-string parsing for the facade endpoints.
//!
//! Every parameter arrives as an optional string so that a missing or
//! malformed value becomes a `ValidationError` (422) instead of an extractor
//! rejection.

use crate::domain::model::{
    DataSourceId, DataSourceQuery, ElementId, PlantId, TimeZoneName, DEFAULT_AGGREGATION_TYPE,
    DEFAULT_GROUPING,
};
use crate::utils::error::{GatewayError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike};
use serde::Deserialize;

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

#[derive(Debug, Default, Clone, Deserialize)]
pub struct ElementsParams {
    pub plant_id: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct TagsParams {
    pub plant_id: Option<String>,
    pub element_id: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct DataParams {
    pub data_source_ids: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub tz: Option<String>,
    pub grouping: Option<String>,
    #[serde(alias = "aggregationType")]
    pub aggregation_type: Option<String>,
}

fn required<'a>(field: &str, value: &'a Option<String>) -> Result<&'a str> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(GatewayError::validation(format!(
            "Missing required query parameter: {}",
            field
        ))),
    }
}

pub fn parse_id(field: &str, value: &Option<String>) -> Result<u64> {
    let raw = required(field, value)?;
    raw.parse().map_err(|_| {
        GatewayError::validation(format!(
            "{} must be an unsigned integer, got '{}'",
            field, raw
        ))
    })
}

/// Parses a comma-separated identifier list, dropping duplicates but keeping
/// first-seen order. Empty segments are skipped.
pub fn parse_data_source_ids(raw: &str) -> Result<Vec<DataSourceId>> {
    let mut ids: Vec<DataSourceId> = Vec::new();
    for segment in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let id: DataSourceId = segment.parse().map_err(|_| {
            GatewayError::validation(format!(
                "data_source_ids must be a comma-separated list of unsigned integers, got '{}'",
                segment
            ))
        })?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }

    if ids.is_empty() {
        return Err(GatewayError::validation(
            "data_source_ids must contain at least one identifier",
        ));
    }
    Ok(ids)
}

/// Parses an ISO-8601 timestamp into wall-clock time on the `tz` clock.
///
/// GPM+ takes whole seconds, so a non-zero fractional part is rejected rather
/// than truncated.
pub fn parse_timestamp(field: &str, raw: &str, tz: TimeZoneName) -> Result<NaiveDateTime> {
    let raw = raw.trim();
    let parsed = parse_wall_clock(field, raw, tz)?;

    if parsed.nanosecond() != 0 {
        return Err(GatewayError::validation(format!(
            "{} must be given in whole seconds, got '{}'",
            field, raw
        )));
    }
    Ok(parsed)
}

fn parse_wall_clock(field: &str, raw: &str, tz: TimeZoneName) -> Result<NaiveDateTime> {
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(raw) {
        return match tz {
            TimeZoneName::Utc => Ok(with_offset.naive_utc()),
            TimeZoneName::Local => Err(GatewayError::validation(format!(
                "{} carries a UTC offset, which cannot be combined with tz=Local",
                field
            ))),
        };
    }

    for format in NAIVE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(parsed);
        }
    }

    if let Some(midnight) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(midnight);
    }

    Err(GatewayError::validation(format!(
        "{} must be an ISO-8601 timestamp (e.g. 2025-10-01T00:00:00), got '{}'",
        field, raw
    )))
}

impl ElementsParams {
    pub fn plant_id(&self) -> Result<PlantId> {
        parse_id("plant_id", &self.plant_id)
    }
}

impl TagsParams {
    pub fn ids(&self) -> Result<(PlantId, ElementId)> {
        Ok((
            parse_id("plant_id", &self.plant_id)?,
            parse_id("element_id", &self.element_id)?,
        ))
    }
}

impl DataParams {
    pub fn into_query(self) -> Result<DataSourceQuery> {
        let tz = match self.tz.as_deref().map(str::trim) {
            None | Some("") => TimeZoneName::default(),
            Some(name) => name
                .parse::<TimeZoneName>()
                .map_err(GatewayError::validation)?,
        };

        let start = parse_timestamp("start", required("start", &self.start)?, tz)?;
        let end = parse_timestamp("end", required("end", &self.end)?, tz)?;
        if start > end {
            return Err(GatewayError::validation(format!(
                "start ({}) must not be after end ({})",
                start, end
            )));
        }

        let data_source_ids =
            parse_data_source_ids(required("data_source_ids", &self.data_source_ids)?)?;

        let grouping = match self.grouping.as_deref().map(str::trim) {
            None => DEFAULT_GROUPING.to_string(),
            Some("") => {
                return Err(GatewayError::validation("grouping cannot be empty"));
            }
            Some(g) => g.to_string(),
        };

        let aggregation_type = match self.aggregation_type.as_deref().map(str::trim) {
            None | Some("") => DEFAULT_AGGREGATION_TYPE,
            Some(raw) => raw.parse().map_err(|_| {
                GatewayError::validation(format!(
                    "aggregation_type must be an unsigned integer, got '{}'",
                    raw
                ))
            })?,
        };

        Ok(DataSourceQuery {
            data_source_ids,
            start,
            end,
            tz,
            grouping,
            aggregation_type,
        })
    }
}
