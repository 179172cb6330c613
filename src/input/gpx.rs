use crate::core::{Coordinate, Track, TrackPoint};
use chrono::{DateTime, NaiveDateTime, Utc};
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

/// Timestamp format written by location recorders: strict ISO-8601 UTC with
/// three fractional digits. Anything else is treated as "no timestamp".
const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Terminal parse failures. Per-point problems (missing or malformed
/// lat/lon, bad elevation or timestamp values) never surface here; they
/// drop the point or the field instead.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Document is not well-formed XML
    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Document is XML but not a GPX document
    #[error("document has no <gpx> root element")]
    NotGpx,
}

/// Which point-marker element a pending point came from
#[derive(Debug, Clone, Copy, PartialEq)]
enum PointKind {
    Track,
    Route,
    Waypoint,
}

/// Which optional child of a point is currently being read
#[derive(Debug, Clone, Copy, PartialEq)]
enum PointField {
    Elevation,
    Time,
}

/// Parse a GPX document into a [`Track`] in one synchronous pass.
///
/// Points are taken from `<trkpt>` elements in document order, flattened
/// across `<trkseg>`s. Documents without track points fall back to `<rtept>`
/// route points, then to `<wpt>` waypoints. A point missing a parseable
/// in-range `lat`/`lon` pair is dropped silently; a point with an
/// unparsable `<ele>` or `<time>` keeps the point and drops the field.
pub fn parse_gpx(data: &[u8]) -> Result<Track, ParseError> {
    let mut reader = Reader::from_reader(data);
    reader.config_mut().trim_text(true);

    let mut track_points: Vec<TrackPoint> = Vec::new();
    let mut route_points: Vec<TrackPoint> = Vec::new();
    let mut waypoints: Vec<TrackPoint> = Vec::new();

    let mut saw_gpx = false;
    let mut name: Option<String> = None;

    let mut in_trk = false;
    let mut in_rte = false;
    let mut in_point: Option<PointKind> = None;
    let mut current: Option<TrackPoint> = None;
    let mut current_field: Option<PointField> = None;
    let mut capturing_name = false;
    let mut text = String::new();

    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.name().local_name().as_ref() {
                b"gpx" => saw_gpx = true,
                b"trk" => in_trk = true,
                b"rte" => in_rte = true,
                b"trkpt" if in_point.is_none() => {
                    in_point = Some(PointKind::Track);
                    current = point_from_attributes(&e);
                }
                b"rtept" if in_point.is_none() => {
                    in_point = Some(PointKind::Route);
                    current = point_from_attributes(&e);
                }
                b"wpt" if in_point.is_none() => {
                    in_point = Some(PointKind::Waypoint);
                    current = point_from_attributes(&e);
                }
                b"ele" if in_point.is_some() => {
                    current_field = Some(PointField::Elevation);
                    text.clear();
                }
                b"time" if in_point.is_some() => {
                    current_field = Some(PointField::Time);
                    text.clear();
                }
                b"name" if (in_trk || in_rte) && in_point.is_none() && name.is_none() => {
                    capturing_name = true;
                    text.clear();
                }
                _ => {}
            },

            Ok(Event::Empty(e)) => match e.name().local_name().as_ref() {
                b"gpx" => saw_gpx = true,
                b"trkpt" if in_point.is_none() => {
                    if let Some(point) = point_from_attributes(&e) {
                        track_points.push(point);
                    }
                }
                b"rtept" if in_point.is_none() => {
                    if let Some(point) = point_from_attributes(&e) {
                        route_points.push(point);
                    }
                }
                b"wpt" if in_point.is_none() => {
                    if let Some(point) = point_from_attributes(&e) {
                        waypoints.push(point);
                    }
                }
                _ => {}
            },

            Ok(Event::Text(t)) => {
                text = t.unescape()?.to_string();
            }

            Ok(Event::End(e)) => match e.name().local_name().as_ref() {
                b"trk" => in_trk = false,
                b"rte" => in_rte = false,
                b"trkpt" | b"rtept" | b"wpt" => {
                    if let (Some(kind), Some(point)) = (in_point, current.take()) {
                        match kind {
                            PointKind::Track => track_points.push(point),
                            PointKind::Route => route_points.push(point),
                            PointKind::Waypoint => waypoints.push(point),
                        }
                    }
                    in_point = None;
                    current_field = None;
                }
                b"ele" => {
                    if current_field == Some(PointField::Elevation) {
                        if let Some(point) = current.as_mut() {
                            point.elevation = text.trim().parse::<f64>().ok();
                        }
                        current_field = None;
                    }
                }
                b"time" => {
                    if current_field == Some(PointField::Time) {
                        if let Some(point) = current.as_mut() {
                            point.time = parse_time(&text);
                        }
                        current_field = None;
                    }
                }
                b"name" => {
                    if capturing_name {
                        let trimmed = text.trim();
                        if !trimmed.is_empty() {
                            name = Some(trimmed.to_string());
                        }
                        capturing_name = false;
                    }
                }
                _ => {}
            },

            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(ParseError::Xml(e)),
        }

        buf.clear();
    }

    if !saw_gpx {
        return Err(ParseError::NotGpx);
    }

    // Track points win; route points and bare waypoints are fallbacks for
    // documents that carry only those.
    let points = if !track_points.is_empty() {
        track_points
    } else if !route_points.is_empty() {
        route_points
    } else {
        waypoints
    };

    Ok(Track::new(name, points))
}

/// Build a point from a marker element's lat/lon attributes.
/// Returns `None` when either attribute is missing, unparsable, or out of
/// range, which drops the point.
fn point_from_attributes(element: &BytesStart) -> Option<TrackPoint> {
    let mut lat = None;
    let mut lon = None;

    for attr in element.attributes().flatten() {
        match attr.key.as_ref() {
            b"lat" => lat = attribute_f64(&attr),
            b"lon" => lon = attribute_f64(&attr),
            _ => {}
        }
    }

    let coordinate = Coordinate::new(lat?, lon?).ok()?;
    Some(TrackPoint::new(coordinate))
}

fn attribute_f64(attr: &Attribute) -> Option<f64> {
    attr.unescape_value().ok()?.trim().parse::<f64>().ok()
}

fn parse_time(text: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(text.trim(), TIME_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}
