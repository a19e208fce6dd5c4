//! Core data types for tracked locations and weather readings

use chrono::{DateTime, Utc};
use serde::{ser::SerializeMap, Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

use crate::error::{QueryError, QueryResult};

/// User identifier (row id in the store)
pub type UserId = i64;

/// Variables requested from the provider on every refresh, in response order.
pub const CURRENT_VARIABLES: [&str; 3] = ["temperature_2m", "surface_pressure", "wind_speed_10m"];

/// Variables resolved by an hourly query when the caller names none.
pub const DEFAULT_HOURLY_VARIABLES: [&str; 4] = [
    "temperature_2m",
    "relative_humidity_2m",
    "precipitation",
    "wind_speed_10m",
];

/// A validated latitude/longitude pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> QueryResult<Self> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(QueryError::Validation(format!(
                "latitude must be within [-90, 90], got {latitude}"
            )));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(QueryError::Validation(format!(
                "longitude must be within [-180, 180], got {longitude}"
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

/// A user-owned location watched by the refresh loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedLocation {
    pub user_id: UserId,
    pub name: String,
    pub coordinates: Coordinates,
}

/// Latest known reading for a tracked location.
///
/// Persisted as a flat JSON object: either the variables plus
/// `last_updated`, or `error` plus `last_updated`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WeatherSnapshot {
    Failed {
        error: String,
        last_updated: DateTime<Utc>,
    },
    Observed {
        #[serde(flatten)]
        values: BTreeMap<String, f64>,
        last_updated: DateTime<Utc>,
    },
}

impl WeatherSnapshot {
    pub fn observed(conditions: &CurrentConditions, at: DateTime<Utc>) -> Self {
        WeatherSnapshot::Observed {
            values: conditions
                .iter()
                .map(|(name, value)| (name.clone(), *value))
                .collect(),
            last_updated: at,
        }
    }

    pub fn failed(error: impl Into<String>, at: DateTime<Utc>) -> Self {
        WeatherSnapshot::Failed {
            error: error.into(),
            last_updated: at,
        }
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        match self {
            WeatherSnapshot::Failed { last_updated, .. }
            | WeatherSnapshot::Observed { last_updated, .. } => *last_updated,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, WeatherSnapshot::Failed { .. })
    }

    pub fn value(&self, name: &str) -> Option<f64> {
        match self {
            WeatherSnapshot::Observed { values, .. } => values.get(name).copied(),
            WeatherSnapshot::Failed { .. } => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }
}

/// Variable name -> value mapping that keeps insertion order.
///
/// Serialises as a JSON object whose keys come out in the order they were
/// pushed.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableMap<V> {
    entries: Vec<(String, V)>,
}

impl<V> VariableMap<V> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, name: impl Into<String>, value: V) {
        self.entries.push((name.into(), value));
    }

    pub fn get(&self, name: &str) -> Option<&V> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &V)> {
        self.entries.iter().map(|(key, value)| (key, value))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V> Default for VariableMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for VariableMap<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl<V: Serialize> Serialize for VariableMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Current conditions returned by the provider
pub type CurrentConditions = VariableMap<f64>;

/// Result of one variable in an hourly lookup
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum HourlyValue {
    Value(f64),
    /// The provider returned no data for this variable
    Missing,
    ExtractionError(String),
}

impl HourlyValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            HourlyValue::Value(v) => Some(*v),
            _ => None,
        }
    }
}

/// Hourly lookup result, in the caller's variable order
pub type HourlyValues = VariableMap<HourlyValue>;

/// Split a comma-separated variable list, dropping blanks.
pub fn parse_variable_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
