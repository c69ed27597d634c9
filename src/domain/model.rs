use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

pub type PlantId = u64;
pub type ElementId = u64;
pub type DataSourceId = u64;

/// Timestamp layout the GPM+ `/DataList/v2` endpoint expects.
pub const UPSTREAM_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

pub const DEFAULT_GROUPING: &str = "raw";
pub const DEFAULT_AGGREGATION_TYPE: u32 = 1;

const PLANT_BASE_FIELDS: [&str; 4] = ["Id", "Name", "ElementCount", "UniqueID"];

/// Entry of the upstream `Parameters` list.
#[derive(Debug, Clone, Deserialize)]
pub struct KeyValue {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "Value", default)]
    pub value: Value,
}

/// Plant record as returned by `GET /Plant`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawPlant {
    #[serde(rename = "Id")]
    pub id: PlantId,
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
    #[serde(rename = "ElementCount", default)]
    pub element_count: Option<i64>,
    #[serde(rename = "UniqueID", default)]
    pub unique_id: Option<Value>,
    #[serde(rename = "Parameters", default)]
    pub parameters: Option<Vec<KeyValue>>,
}

/// Plant with its parameter list flattened into top-level properties.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plant {
    #[serde(rename = "Id")]
    pub id: PlantId,
    #[serde(rename = "Name")]
    pub name: Option<String>,
    #[serde(rename = "ElementCount")]
    pub element_count: Option<i64>,
    #[serde(rename = "UniqueID")]
    pub unique_id: Option<Value>,
    #[serde(flatten)]
    pub properties: BTreeMap<String, Value>,
}

impl Plant {
    pub fn from_upstream(value: Value) -> serde_json::Result<Self> {
        let raw: RawPlant = serde_json::from_value(value)?;
        Ok(raw.into())
    }
}

impl From<RawPlant> for Plant {
    fn from(raw: RawPlant) -> Self {
        let mut properties = BTreeMap::new();
        for KeyValue { key, value } in raw.parameters.unwrap_or_default() {
            if PLANT_BASE_FIELDS.contains(&key.as_str()) {
                tracing::debug!("Plant {} parameter '{}' shadows a base field, skipped", raw.id, key);
                continue;
            }
            properties.insert(key, value);
        }

        Plant {
            id: raw.id,
            name: raw.name,
            element_count: raw.element_count,
            unique_id: raw.unique_id,
            properties,
        }
    }
}

/// Clock the upstream interprets a query window in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum TimeZoneName {
    #[default]
    #[serde(rename = "UTC")]
    Utc,
    /// Plant local time.
    #[serde(rename = "Local")]
    Local,
}

impl TimeZoneName {
    pub const ACCEPTED: [&'static str; 2] = ["UTC", "Local"];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeZoneName::Utc => "UTC",
            TimeZoneName::Local => "Local",
        }
    }

    /// Header sent along with `/DataList/v2`. Local time is the upstream default.
    pub fn upstream_header(&self) -> Option<(&'static str, &'static str)> {
        match self {
            TimeZoneName::Utc => Some(("TimeZone", "UTC")),
            TimeZoneName::Local => None,
        }
    }
}

impl FromStr for TimeZoneName {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("utc") {
            Ok(TimeZoneName::Utc)
        } else if trimmed.eq_ignore_ascii_case("local") {
            Ok(TimeZoneName::Local)
        } else {
            Err(format!(
                "Unrecognized time zone '{}'. Accepted values: {}",
                s,
                Self::ACCEPTED.join(", ")
            ))
        }
    }
}

impl fmt::Display for TimeZoneName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Time-series request across one or more data sources.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSourceQuery {
    pub data_source_ids: Vec<DataSourceId>,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub tz: TimeZoneName,
    pub grouping: String,
    pub aggregation_type: u32,
}

impl DataSourceQuery {
    pub fn new(data_source_ids: Vec<DataSourceId>, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            data_source_ids,
            start,
            end,
            tz: TimeZoneName::default(),
            grouping: DEFAULT_GROUPING.to_string(),
            aggregation_type: DEFAULT_AGGREGATION_TYPE,
        }
    }

    pub fn with_tz(mut self, tz: TimeZoneName) -> Self {
        self.tz = tz;
        self
    }

    pub fn start_param(&self) -> String {
        self.start.format(UPSTREAM_TIMESTAMP_FORMAT).to_string()
    }

    pub fn end_param(&self) -> String {
        self.end.format(UPSTREAM_TIMESTAMP_FORMAT).to_string()
    }
}

/// Rows the upstream returned for one data source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeriesResult {
    pub data_source_id: DataSourceId,
    pub values: Vec<Value>,
}

fn row_data_source_id(row: &Value) -> Option<DataSourceId> {
    match row.get("DataSourceId")? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Splits one `/DataList/v2` payload into per-identifier results, in `batch` order.
///
/// In a single-identifier batch every row belongs to that identifier. Otherwise
/// rows are attributed by their `DataSourceId` field and a row that cannot be
/// attributed to a requested identifier is an error. A non-array payload counts
/// as one row.
pub fn group_rows(
    batch: &[DataSourceId],
    payload: Value,
) -> std::result::Result<Vec<TimeSeriesResult>, String> {
    let rows = match payload {
        Value::Array(rows) => rows,
        Value::Null => Vec::new(),
        other => vec![other],
    };

    if let [only] = batch {
        return Ok(vec![TimeSeriesResult {
            data_source_id: *only,
            values: rows,
        }]);
    }

    let mut buckets: HashMap<DataSourceId, Vec<Value>> =
        batch.iter().map(|id| (*id, Vec::new())).collect();

    for row in rows {
        let id = row_data_source_id(&row)
            .ok_or_else(|| format!("row without a usable DataSourceId: {}", row))?;
        match buckets.get_mut(&id) {
            Some(bucket) => bucket.push(row),
            None => return Err(format!("row for unrequested DataSourceId {}", id)),
        }
    }

    Ok(batch
        .iter()
        .map(|id| TimeSeriesResult {
            data_source_id: *id,
            values: buckets.remove(id).unwrap_or_default(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plant_parameters_are_flattened() {
        let plant = Plant::from_upstream(json!({
            "Id": 7,
            "Name": "Sunfield",
            "ElementCount": 42,
            "UniqueID": "abc-123",
            "Parameters": [
                {"Key": "Capacity", "Value": 5.2},
                {"Key": "Country", "Value": "US"}
            ],
            "Ignored": true
        }))
        .unwrap();

        let out = serde_json::to_value(&plant).unwrap();
        assert_eq!(
            out,
            json!({
                "Id": 7,
                "Name": "Sunfield",
                "ElementCount": 42,
                "UniqueID": "abc-123",
                "Capacity": 5.2,
                "Country": "US"
            })
        );
    }

    #[test]
    fn test_plant_parameter_cannot_shadow_base_field() {
        let plant = Plant::from_upstream(json!({
            "Id": 7,
            "Name": "Sunfield",
            "Parameters": [{"Key": "Name", "Value": "Other"}]
        }))
        .unwrap();

        assert_eq!(plant.name.as_deref(), Some("Sunfield"));
        assert!(plant.properties.is_empty());
    }

    #[test]
    fn test_plant_with_null_parameters() {
        let plant = Plant::from_upstream(json!({"Id": 1, "Parameters": null})).unwrap();
        assert_eq!(plant.id, 1);
        assert!(plant.properties.is_empty());
    }

    #[test]
    fn test_time_zone_parsing() {
        assert_eq!("utc".parse::<TimeZoneName>(), Ok(TimeZoneName::Utc));
        assert_eq!("Local".parse::<TimeZoneName>(), Ok(TimeZoneName::Local));
        assert!("Europe/Madrid".parse::<TimeZoneName>().is_err());
        assert_eq!(TimeZoneName::Utc.upstream_header(), Some(("TimeZone", "UTC")));
        assert_eq!(TimeZoneName::Local.upstream_header(), None);
    }

    #[test]
    fn test_group_rows_single_id_takes_everything() {
        let rows = json!([{"Date": "2025-10-01T00:00:00", "Value": 1.0}]);
        let grouped = group_rows(&[123], rows).unwrap();
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped[0].data_source_id, 123);
        assert_eq!(grouped[0].values.len(), 1);
    }

    #[test]
    fn test_group_rows_keeps_batch_order() {
        let rows = json!([
            {"DataSourceId": 456, "Value": 2.0},
            {"DataSourceId": "123", "Value": 1.0},
            {"DataSourceId": 456, "Value": 3.0}
        ]);
        let grouped = group_rows(&[123, 456, 789], rows).unwrap();
        let ids: Vec<_> = grouped.iter().map(|r| r.data_source_id).collect();
        assert_eq!(ids, vec![123, 456, 789]);
        assert_eq!(grouped[0].values.len(), 1);
        assert_eq!(grouped[1].values.len(), 2);
        assert!(grouped[2].values.is_empty());
    }

    #[test]
    fn test_group_rows_rejects_unattributable_row() {
        let rows = json!([{"Value": 2.0}]);
        assert!(group_rows(&[1, 2], rows).is_err());

        let rows = json!([{"DataSourceId": 9, "Value": 2.0}]);
        assert!(group_rows(&[1, 2], rows).is_err());
    }

    #[test]
    fn test_query_params_are_formatted_for_upstream() {
        let start = NaiveDateTime::parse_from_str("2025-10-01 00:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
        let end = NaiveDateTime::parse_from_str("2025-10-02 06:30:15", "%Y-%m-%d %H:%M:%S").unwrap();
        let query = DataSourceQuery::new(vec![1], start, end);
        assert_eq!(query.start_param(), "2025-10-01T00:00:00");
        assert_eq!(query.end_param(), "2025-10-02T06:30:15");
        assert_eq!(query.grouping, "raw");
        assert_eq!(query.aggregation_type, 1);
    }
}
