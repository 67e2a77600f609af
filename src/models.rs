//! Data models.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{ser::SerializeStruct, Deserialize, Serialize, Serializer};

use crate::errors::{IssRecorderError, Result};
use crate::normalizer;

/// Position payload as returned by the upstream API
///
/// See: http://open-notify.org/Open-Notify-API/ISS-Location-Now/
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawPosition {
    /// Observation time in seconds from Unix epoch
    #[serde(default)]
    pub timestamp: Option<i64>,
    /// Status string, "success" on a healthy response
    #[serde(default)]
    pub message: Option<String>,
    #[serde(rename = "iss_position")]
    pub position: RawCoordinates,
}

/// Coordinate pair, each a decimal number encoded as text
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawCoordinates {
    pub longitude: String,
    pub latitude: String,
}

impl RawPosition {
    pub fn new(longitude: impl Into<String>, latitude: impl Into<String>) -> Self {
        Self {
            timestamp: None,
            message: None,
            position: RawCoordinates {
                longitude: longitude.into(),
                latitude: latitude.into(),
            },
        }
    }

    /// Observation time, if the payload carried a valid one
    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
    }
}

/// Validated coordinate pair
///
/// Keeps the text each coordinate was parsed from, so that the WKT form
/// carries exactly the received digits.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedPosition {
    longitude: f64,
    latitude: f64,
    longitude_text: String,
    latitude_text: String,
}

impl NormalizedPosition {
    /// Position from numeric values, formatted with the shortest
    /// representation that parses back to the same value.
    pub fn new(longitude: f64, latitude: f64) -> Result<Self> {
        normalizer::normalize_coordinates(&longitude.to_string(), &latitude.to_string())
    }

    pub(crate) fn from_parts(
        longitude: f64,
        latitude: f64,
        longitude_text: String,
        latitude_text: String,
    ) -> Self {
        Self {
            longitude,
            latitude,
            longitude_text,
            latitude_text,
        }
    }

    /// Longitude in decimal degrees
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Latitude in decimal degrees
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Numeric `(longitude, latitude)` pair
    pub fn as_pair(&self) -> (f64, f64) {
        (self.longitude, self.latitude)
    }

    /// Well-known text point, `POINT(<lon> <lat>)`
    pub fn to_wkt(&self) -> String {
        format!("POINT({} {})", self.longitude_text, self.latitude_text)
    }

    /// Parse a `POINT(<lon> <lat>)` string
    pub fn from_wkt(wkt: &str) -> Result<Self> {
        let invalid = || IssRecorderError::InvalidStoredPosition(wkt.to_string());

        let inner = wkt
            .trim()
            .strip_prefix("POINT")
            .map(str::trim_start)
            .and_then(|s| s.strip_prefix('('))
            .and_then(|s| s.strip_suffix(')'))
            .ok_or_else(invalid)?;

        let mut parts = inner.split_whitespace();
        match (parts.next(), parts.next(), parts.next()) {
            (Some(lon), Some(lat), None) => {
                normalizer::normalize_coordinates(lon, lat).map_err(|_| invalid())
            }
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for NormalizedPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wkt())
    }
}

// Serialize as plain numbers
impl Serialize for NormalizedPosition {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("NormalizedPosition", 2)?;
        state.serialize_field("longitude", &self.longitude)?;
        state.serialize_field("latitude", &self.latitude)?;
        state.end()
    }
}

/// Position record read back from the database
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredRecord {
    /// Server-generated insert time
    pub timestamp: DateTime<Utc>,
    pub position: NormalizedPosition,
}
