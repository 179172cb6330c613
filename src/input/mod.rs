pub mod gpx;

pub use gpx::parse_gpx;

use crate::core::Track;
use anyhow::{Context, Result};
use std::path::Path;

/// Load a track from a GPX file on disk
pub fn load_track(path: &Path) -> Result<Track> {
    let data = std::fs::read(path)
        .with_context(|| format!("failed to read track file {}", path.display()))?;

    let track = parse_gpx(&data).with_context(|| format!("failed to parse {}", path.display()))?;

    Ok(track)
}
