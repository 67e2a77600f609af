//! Coordinate normalization
//!
//! Turns the textual coordinates of a [`RawPosition`] into a validated
//! [`NormalizedPosition`]. No I/O happens here.

use crate::errors::{IssRecorderError, Result};
use crate::models::{NormalizedPosition, RawPosition};

pub const LONGITUDE: &str = "longitude";
pub const LATITUDE: &str = "latitude";

/// Normalize a decoded payload
pub fn normalize(raw: &RawPosition) -> Result<NormalizedPosition> {
    normalize_coordinates(&raw.position.longitude, &raw.position.latitude)
}

/// Normalize a textual longitude/latitude pair
///
/// Longitude is checked first, so when both fields are bad the error names
/// the longitude.
pub fn normalize_coordinates(longitude: &str, latitude: &str) -> Result<NormalizedPosition> {
    let (lon, lon_text) = parse_coordinate(LONGITUDE, longitude, 180.0)?;
    let (lat, lat_text) = parse_coordinate(LATITUDE, latitude, 90.0)?;
    Ok(NormalizedPosition::from_parts(lon, lat, lon_text, lat_text))
}

fn parse_coordinate(field: &'static str, text: &str, limit: f64) -> Result<(f64, String)> {
    let trimmed = text.trim();
    let value = trimmed
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| IssRecorderError::ParseError {
            field,
            value: text.to_string(),
        })?;

    if !(-limit..=limit).contains(&value) {
        return Err(IssRecorderError::OutOfRange { field, value });
    }

    Ok((value, trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_error_field(result: Result<NormalizedPosition>) -> &'static str {
        match result {
            Err(IssRecorderError::ParseError { field, .. }) => field,
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn normalize_valid_position() {
        let position = normalize(&RawPosition::new("10.5", "-20.25")).unwrap();

        assert_eq!(position.as_pair(), (10.5, -20.25));
        assert_eq!(position.to_wkt(), "POINT(10.5 -20.25)");
    }

    #[test]
    fn numeric_pair_matches_parsed_floats() {
        let samples = [
            ("0", "0"),
            ("-180", "90"),
            ("179.9999999", "-89.99999999"),
            ("1e1", "-2.5E1"),
            ("+42.0001", ".5"),
            ("-0.0", "12."),
        ];
        for (lon, lat) in samples {
            let position = normalize(&RawPosition::new(lon, lat)).unwrap();
            assert_eq!(position.longitude(), lon.parse::<f64>().unwrap());
            assert_eq!(position.latitude(), lat.parse::<f64>().unwrap());
        }
    }

    #[test]
    fn wkt_preserves_received_precision() {
        let position = normalize(&RawPosition::new("-104.82310", "51.5866000")).unwrap();
        assert_eq!(position.to_wkt(), "POINT(-104.82310 51.5866000)");
    }

    #[test]
    fn surrounding_whitespace_is_dropped() {
        let position = normalize(&RawPosition::new(" 1.5", "2.5\n")).unwrap();
        assert_eq!(position.to_wkt(), "POINT(1.5 2.5)");
    }

    #[test]
    fn non_numeric_longitude() {
        let result = normalize(&RawPosition::new("abc", "5.0"));
        assert_eq!(parse_error_field(result), LONGITUDE);
    }

    #[test]
    fn non_numeric_latitude() {
        let result = normalize(&RawPosition::new("5.0", "12,5"));
        assert_eq!(parse_error_field(result), LATITUDE);
    }

    #[test]
    fn both_fields_bad_names_longitude() {
        let result = normalize(&RawPosition::new("x", "y"));
        assert_eq!(parse_error_field(result), LONGITUDE);
    }

    #[test]
    fn non_finite_and_empty_are_rejected() {
        for bad in ["", "   ", "NaN", "inf", "-infinity", "0x10"] {
            let result = normalize(&RawPosition::new(bad, "0"));
            assert_eq!(parse_error_field(result), LONGITUDE, "{bad:?}");
        }
    }

    #[test]
    fn out_of_range_is_rejected() {
        match normalize(&RawPosition::new("180.5", "0")) {
            Err(IssRecorderError::OutOfRange { field, value }) => {
                assert_eq!(field, LONGITUDE);
                assert_eq!(value, 180.5);
            }
            other => panic!("expected out of range, got {other:?}"),
        }
        match normalize(&RawPosition::new("0", "-90.01")) {
            Err(IssRecorderError::OutOfRange { field, .. }) => assert_eq!(field, LATITUDE),
            other => panic!("expected out of range, got {other:?}"),
        }
    }

    #[test]
    fn wkt_round_trip_within_tolerance() {
        let samples = [("10.5", "-20.25"), ("-0.000001", "89.123456789"), ("179.5", "-1e-7")];
        for (lon, lat) in samples {
            let position = normalize(&RawPosition::new(lon, lat)).unwrap();
            let back = NormalizedPosition::from_wkt(&position.to_wkt()).unwrap();
            assert!((back.longitude() - position.longitude()).abs() < f64::EPSILON);
            assert!((back.latitude() - position.latitude()).abs() < f64::EPSILON);
        }
    }
}
