use crate::core::Coordinate;
use chrono::{DateTime, Utc};

/// A single recorded GPS sample
#[derive(Debug, Clone, PartialEq)]
pub struct TrackPoint {
    /// Validated position in decimal degrees
    pub coordinate: Coordinate,

    /// Elevation in meters, when the recording carried one
    pub elevation: Option<f64>,

    /// Recording timestamp in UTC
    pub time: Option<DateTime<Utc>>,
}

impl TrackPoint {
    /// Create a point with no elevation or timestamp
    pub fn new(coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            elevation: None,
            time: None,
        }
    }
}

/// An ordered sequence of track points from one loaded file
///
/// Index order is temporal sequence order, exactly as the points appeared
/// in the source document. The playback engine owns one `Track` at a time
/// and replaces it wholesale when a new file is loaded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Track {
    /// Display name from the source document, if it carried one
    pub name: Option<String>,

    points: Vec<TrackPoint>,
}

impl Track {
    /// Create a track from parsed points
    pub fn new(name: Option<String>, points: Vec<TrackPoint>) -> Self {
        Self { name, points }
    }

    pub fn points(&self) -> &[TrackPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TrackPoint> {
        self.points.get(index)
    }
}
