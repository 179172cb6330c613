pub mod coordinate;
pub mod track;

pub use coordinate::{Coordinate, CoordinateError};
pub use track::{Track, TrackPoint};
