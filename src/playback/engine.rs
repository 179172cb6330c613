use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, Mutex, Notify};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::core::{Coordinate, Track};
use crate::playback::{PlaybackError, PlaybackEvent, PlaybackSnapshot, PlaybackStatus};
use crate::sim::{set_location, CommandRunner, DeviceTarget};

/// Floor on the delay between consecutive points
const MIN_TICK_SECS: f64 = 0.1;

/// Replays a loaded track against a simulator by pacing location commands.
///
/// All mutable state lives behind one mutex, so transitions are linearized
/// with the pacing loop. The loop runs as a spawned task; `start`, `pause`
/// and `stop` cancel it through a notify token plus a generation counter,
/// keeping at most one loop live per engine.
pub struct PlaybackEngine {
    shared: Arc<Mutex<EngineState>>,
    runner: Arc<dyn CommandRunner>,
}

struct EngineState {
    track: Track,
    status: PlaybackStatus,
    index: usize,
    speed: f64,
    target: DeviceTarget,
    manual_latitude: Option<String>,
    manual_longitude: Option<String>,
    /// Cancellation token for the live pacing loop, if any
    cancel: Option<Arc<Notify>>,
    /// Bumped on every transition; a loop exits once its copy is stale
    generation: u64,
    events: Option<mpsc::UnboundedSender<PlaybackEvent>>,
}

impl EngineState {
    fn emit(&self, event: PlaybackEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }

    fn cancel_loop(&mut self) {
        self.generation += 1;
        if let Some(cancel) = self.cancel.take() {
            cancel.notify_one();
        }
    }
}

impl PlaybackEngine {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            shared: Arc::new(Mutex::new(EngineState {
                track: Track::default(),
                status: PlaybackStatus::Idle,
                index: 0,
                speed: 1.0,
                target: DeviceTarget::Booted,
                manual_latitude: None,
                manual_longitude: None,
                cancel: None,
                generation: 0,
                events: None,
            })),
            runner,
        }
    }

    /// Replace the loaded track, discarding any in-flight playback
    pub async fn load_track(&self, track: Track) {
        let mut state = self.shared.lock().await;
        state.cancel_loop();
        state.status = PlaybackStatus::Idle;
        state.index = 0;
        match &track.name {
            Some(name) => info!("track loaded: {} ({} points)", name, track.len()),
            None => info!("track loaded: {} points", track.len()),
        }
        state.track = track;
    }

    /// Aim subsequent location commands at a different device
    pub async fn set_target(&self, target: DeviceTarget) {
        self.shared.lock().await.target = target;
    }

    /// Set the speed multiplier, clamped to a sane range.
    ///
    /// Read fresh on every tick, so a change mid-playback takes effect on
    /// the next point.
    pub async fn set_speed(&self, speed: f64) {
        self.shared.lock().await.speed = speed.max(0.1).min(10.0);
    }

    /// Provide the coordinate used when starting with no track loaded
    pub async fn set_manual_coordinate(&self, latitude: &str, longitude: &str) {
        let mut state = self.shared.lock().await;
        state.manual_latitude = Some(latitude.to_string());
        state.manual_longitude = Some(longitude.to_string());
    }

    /// Start or resume playback.
    ///
    /// With a loaded track this launches the pacing loop, resuming from the
    /// current point after a pause and from the first point otherwise. Any
    /// prior loop is cancelled first. With no track the engine falls back to
    /// single-coordinate mode: validate the manual coordinate, send it once,
    /// stay `Idle`.
    pub async fn start(&self) -> Result<(), PlaybackError> {
        let mut state = self.shared.lock().await;

        if state.track.is_empty() {
            let coordinate = match (&state.manual_latitude, &state.manual_longitude) {
                (Some(lat), Some(lon)) => Coordinate::parse(lat, lon)?,
                _ => return Err(PlaybackError::NoTrackLoaded),
            };
            set_location(self.runner.as_ref(), &state.target, coordinate).await?;
            info!("location set to {}", coordinate);
            return Ok(());
        }

        state.cancel_loop();
        if state.index >= state.track.len() {
            state.index = 0;
        }
        state.status = PlaybackStatus::Playing;

        let cancel = Arc::new(Notify::new());
        state.cancel = Some(cancel.clone());
        info!(
            "playback started at point {} of {}",
            state.index + 1,
            state.track.len()
        );

        tokio::spawn(pacing_loop(
            self.shared.clone(),
            self.runner.clone(),
            cancel,
            state.generation,
        ));
        Ok(())
    }

    /// Pause without losing position; a later start resumes the same point
    pub async fn pause(&self) {
        let mut state = self.shared.lock().await;
        if state.status != PlaybackStatus::Playing {
            return;
        }
        state.cancel_loop();
        state.status = PlaybackStatus::Paused;
        info!(
            "playback paused at point {} of {}",
            state.index + 1,
            state.track.len()
        );
    }

    /// Stop playback and reset to the start of the track
    pub async fn stop(&self) {
        let mut state = self.shared.lock().await;
        if state.status != PlaybackStatus::Playing && state.status != PlaybackStatus::Paused {
            return;
        }
        state.cancel_loop();
        state.status = PlaybackStatus::Idle;
        state.index = 0;
        info!("playback stopped");
    }

    /// Current engine state as one consistent view
    pub async fn snapshot(&self) -> PlaybackSnapshot {
        let state = self.shared.lock().await;
        PlaybackSnapshot {
            status: state.status,
            index: state.index,
            total: state.track.len(),
            speed: state.speed,
            target: state.target.clone(),
        }
    }

    /// Subscribe to progress events, replacing any earlier subscriber
    pub async fn subscribe(&self) -> mpsc::UnboundedReceiver<PlaybackEvent> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.shared.lock().await.events = Some(sender);
        receiver
    }
}

/// One live pacing loop. Exits when cancelled, superseded or complete.
async fn pacing_loop(
    shared: Arc<Mutex<EngineState>>,
    runner: Arc<dyn CommandRunner>,
    cancel: Arc<Notify>,
    generation: u64,
) {
    loop {
        let delay = {
            let state = shared.lock().await;
            if state.generation != generation || state.status != PlaybackStatus::Playing {
                return;
            }

            let index = state.index;
            let total = state.track.len();
            let (coordinate, delay) = match state.track.get(index) {
                Some(point) => (
                    point.coordinate,
                    tick_delay(
                        point.time,
                        state.track.get(index + 1).and_then(|next| next.time),
                        state.speed,
                    ),
                ),
                None => return,
            };

            // Invoking under the lock serializes commands with transitions
            // and with any superseding loop.
            match set_location(runner.as_ref(), &state.target, coordinate).await {
                Ok(()) => {
                    debug!("sent point {}/{}: {}", index + 1, total, coordinate);
                    state.emit(PlaybackEvent::Tick {
                        index,
                        total,
                        coordinate,
                    });
                }
                Err(err) => {
                    warn!("point {}/{} not delivered: {}", index + 1, total, err);
                    state.emit(PlaybackEvent::CommandFailed {
                        index,
                        message: err.to_string(),
                    });
                }
            }

            delay
        };

        tokio::select! {
            _ = cancel.notified() => return,
            _ = sleep(delay) => {}
        }

        let mut state = shared.lock().await;
        if state.generation != generation || state.status != PlaybackStatus::Playing {
            return;
        }
        state.index += 1;
        if state.index >= state.track.len() {
            state.index = 0;
            state.status = PlaybackStatus::Completed;
            state.cancel = None;
            info!("playback complete");
            state.emit(PlaybackEvent::Completed);
            return;
        }
    }
}

/// Delay before advancing past the point at `current`.
///
/// With timestamps on both points the recorded gap is scaled by the speed
/// multiplier and floored; otherwise playback falls back to a one-second
/// cadence, speed-scaled the same way.
fn tick_delay(current: Option<DateTime<Utc>>, next: Option<DateTime<Utc>>, speed: f64) -> Duration {
    match (current, next) {
        (Some(current), Some(next)) => {
            let gap = (next - current).num_milliseconds() as f64 / 1000.0;
            Duration::from_secs_f64((gap / speed).max(MIN_TICK_SECS))
        }
        _ => Duration::from_secs_f64(1.0 / speed),
    }
}
