use std::fmt;
use thiserror::Error;

/// Errors from constructing or parsing a coordinate
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordinateError {
    /// Value is outside the valid decimal-degree range
    #[error("{axis} {value} is outside the valid range {min}..={max}")]
    OutOfRange {
        axis: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Value is not a decimal number
    #[error("'{text}' is not a valid decimal {axis}")]
    NotDecimal { axis: &'static str, text: String },
}

/// A validated geographic coordinate in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

impl Coordinate {
    /// Create a coordinate, validating both axes
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinateError::OutOfRange {
                axis: "latitude",
                value: latitude,
                min: -90.0,
                max: 90.0,
            });
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateError::OutOfRange {
                axis: "longitude",
                value: longitude,
                min: -180.0,
                max: 180.0,
            });
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Parse a coordinate from two decimal-degree strings
    pub fn parse(latitude: &str, longitude: &str) -> Result<Self, CoordinateError> {
        let lat = parse_axis("latitude", latitude)?;
        let lon = parse_axis("longitude", longitude)?;
        Self::new(lat, lon)
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

fn parse_axis(axis: &'static str, text: &str) -> Result<f64, CoordinateError> {
    text.trim()
        .parse::<f64>()
        .map_err(|_| CoordinateError::NotDecimal {
            axis,
            text: text.to_string(),
        })
}

impl fmt::Display for Coordinate {
    /// Fixed-precision wire format expected by `simctl location ... set`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6},{:.6}", self.latitude, self.longitude)
    }
}
