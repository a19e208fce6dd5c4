//! Table layout and row types

use crate::DbResult;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use wxtrack_core::{Coordinates, TrackedLocation, UserId, WeatherSnapshot};

/// Table names
pub mod tables {
    pub const USERS: &str = "users";
    pub const LOCATIONS: &str = "locations";
}

/// Statements applied on connect, in order
pub const SCHEMA: [&str; 2] = [
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS locations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users (id),
        name TEXT NOT NULL,
        latitude REAL NOT NULL,
        longitude REAL NOT NULL,
        weather TEXT,
        last_updated TEXT,
        UNIQUE (user_id, name)
    )
    "#,
];

/// Registered user
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct UserRow {
    pub id: UserId,
    pub username: String,
}

/// Tracked location with its encoded snapshot
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct LocationRow {
    pub user_id: UserId,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,

    /// JSON-encoded [`WeatherSnapshot`], `NULL` until the first refresh
    pub weather: Option<String>,

    /// Copy of the snapshot timestamp (RFC 3339)
    pub last_updated: Option<String>,
}

impl LocationRow {
    pub fn tracked(&self) -> TrackedLocation {
        TrackedLocation {
            user_id: self.user_id,
            name: self.name.clone(),
            coordinates: Coordinates {
                latitude: self.latitude,
                longitude: self.longitude,
            },
        }
    }

    pub fn snapshot(&self) -> DbResult<Option<WeatherSnapshot>> {
        match self.weather.as_deref() {
            Some(blob) => Ok(Some(WeatherSnapshot::from_json(blob)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(weather: Option<&str>) -> LocationRow {
        LocationRow {
            user_id: 1,
            name: "London".into(),
            latitude: 51.5074,
            longitude: -0.1278,
            weather: weather.map(str::to_string),
            last_updated: None,
        }
    }

    #[test]
    fn row_converts_to_tracked_location() {
        let tracked = row(None).tracked();
        assert_eq!(tracked.user_id, 1);
        assert_eq!(tracked.name, "London");
        assert_eq!(tracked.coordinates.latitude, 51.5074);
    }

    #[test]
    fn snapshot_decoding() {
        assert!(row(None).snapshot().unwrap().is_none());

        let blob = r#"{"error":"boom","last_updated":"2024-01-01T00:00:00Z"}"#;
        let snapshot = row(Some(blob)).snapshot().unwrap().unwrap();
        assert!(snapshot.is_error());

        assert!(row(Some("not json")).snapshot().is_err());
    }

    #[test]
    fn test_table_names() {
        assert_eq!(tables::USERS, "users");
        assert_eq!(tables::LOCATIONS, "locations");
    }
}
