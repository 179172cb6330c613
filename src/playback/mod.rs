pub mod engine;

pub use engine::PlaybackEngine;

use thiserror::Error;

use crate::core::{Coordinate, CoordinateError};
use crate::sim::{DeviceTarget, SimctlError};

/// Playback status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStatus {
    Idle,
    Playing,
    Paused,
    Completed,
}

impl std::fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            PlaybackStatus::Idle => "idle",
            PlaybackStatus::Playing => "playing",
            PlaybackStatus::Paused => "paused",
            PlaybackStatus::Completed => "completed",
        };
        write!(f, "{}", label)
    }
}

/// Point-in-time view of the engine state
#[derive(Debug, Clone)]
pub struct PlaybackSnapshot {
    pub status: PlaybackStatus,
    /// Index of the point the engine is at, always < `total` while playing
    pub index: usize,
    pub total: usize,
    pub speed: f64,
    pub target: DeviceTarget,
}

/// Progress notifications emitted by the pacing loop
#[derive(Debug, Clone)]
pub enum PlaybackEvent {
    /// The point at `index` was sent to the device
    Tick {
        index: usize,
        total: usize,
        coordinate: Coordinate,
    },
    /// Sending the point at `index` failed; playback continues
    CommandFailed { index: usize, message: String },
    /// The final point was played and the engine reset
    Completed,
}

/// Validation and invocation failures reported by `start()`
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("no track loaded")]
    NoTrackLoaded,

    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(#[from] CoordinateError),

    #[error(transparent)]
    Command(#[from] SimctlError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_labels() {
        assert_eq!(PlaybackStatus::Idle.to_string(), "idle");
        assert_eq!(PlaybackStatus::Playing.to_string(), "playing");
        assert_eq!(PlaybackStatus::Paused.to_string(), "paused");
        assert_eq!(PlaybackStatus::Completed.to_string(), "completed");
    }
}
