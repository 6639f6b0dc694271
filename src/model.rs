use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Shortest state vector that still carries every field we read.
pub const MIN_STATE_FIELDS: usize = 10;

const IDX_CALLSIGN: usize = 1;
const IDX_ORIGIN_COUNTRY: usize = 2;
const IDX_LONGITUDE: usize = 5;
const IDX_LATITUDE: usize = 6;
const IDX_BARO_ALTITUDE: usize = 7;
const IDX_VELOCITY: usize = 9;

/// Body of `/api/states/all`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct StatesResponse {
    #[serde(default, deserialize_with = "de_opt_i64_from_any")]
    pub time: Option<i64>,
    #[serde(default)]
    pub states: Option<Vec<Value>>,
}

impl StatesResponse {
    /// Decodes every state vector, dropping the ones that do not fit.
    pub fn records(&self) -> Vec<FlightRecord> {
        self.states
            .as_deref()
            .unwrap_or_default()
            .iter()
            .filter_map(|raw| raw.as_array())
            .filter_map(|raw| decode_state(raw))
            .collect()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct FlightRecord {
    pub callsign: Option<String>,
    pub origin_country: Option<String>,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub baro_altitude: Option<f64>,
    pub velocity: Option<f64>,
}

/// Maps one positional state vector into a record. Arrays shorter than
/// [`MIN_STATE_FIELDS`] yield `None`; individual fields never fail.
pub fn decode_state(raw: &[Value]) -> Option<FlightRecord> {
    if raw.len() < MIN_STATE_FIELDS {
        return None;
    }
    Some(FlightRecord {
        callsign: sanitize_callsign(&raw[IDX_CALLSIGN]),
        origin_country: raw[IDX_ORIGIN_COUNTRY].as_str().map(str::to_string),
        longitude: coerce_f64(&raw[IDX_LONGITUDE]),
        latitude: coerce_f64(&raw[IDX_LATITUDE]),
        baro_altitude: coerce_f64(&raw[IDX_BARO_ALTITUDE]),
        velocity: coerce_f64(&raw[IDX_VELOCITY]),
    })
}

pub fn coerce_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                None
            } else {
                trimmed.parse::<f64>().ok()
            }
        }
        _ => None,
    }
}

pub fn sanitize_callsign(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::String(text) => text.trim().to_string(),
        other => other.to_string().trim().to_string(),
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn de_opt_i64_from_any<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(number) => {
            if let Some(value) = number.as_i64() {
                Ok(Some(value))
            } else {
                Ok(number.as_f64().map(|value| value as i64))
            }
        }
        Value::String(text) => Ok(text.trim().parse::<i64>().ok()),
        _ => Ok(None),
    }
}
