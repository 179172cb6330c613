mod core;
mod input;
mod playback;
mod sim;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::bail;
use clap::{ArgAction, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use crate::input::load_track;
use crate::playback::{PlaybackEngine, PlaybackEvent};
use crate::sim::{list_devices, pick_default, DeviceTarget, ProcessRunner};

/// GPS track replay and location injection for iOS simulators
#[derive(Parser, Debug)]
#[command(name = "simtrack", version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List available simulator devices
    Devices,

    /// Set the location to a single coordinate
    Set {
        /// Latitude in decimal degrees
        #[arg(allow_negative_numbers = true)]
        latitude: String,

        /// Longitude in decimal degrees
        #[arg(allow_negative_numbers = true)]
        longitude: String,

        /// Device UDID, or `booted` for the active simulator
        #[arg(short, long)]
        device: Option<String>,
    },

    /// Replay a GPX track with timestamp pacing
    Play {
        /// Path to the GPX file
        file: PathBuf,

        /// Device UDID, or `booted` for the active simulator
        #[arg(short, long)]
        device: Option<String>,

        /// Speed multiplier, clamped to 0.1..10
        #[arg(short, long)]
        speed: Option<f64>,
    },
}

/// Persistent preferences
#[derive(Serialize, Deserialize, Default)]
struct Settings {
    device: Option<String>,
    speed: Option<f64>,
}

impl Settings {
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|base| base.join("simtrack").join("settings.json"))
    }

    fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Read from one concrete path; a missing or unreadable file is defaults
    fn load_from(path: &Path) -> Self {
        if path.exists() {
            if let Ok(contents) = fs::read_to_string(path) {
                if let Ok(settings) = serde_json::from_str(&contents) {
                    return settings;
                }
            }
        }
        Self::default()
    }

    fn save(&self) {
        if let Some(path) = Self::config_path() {
            self.save_to(&path);
        }
    }

    /// Best-effort write; a failure keeps whatever was on disk before
    fn save_to(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        if let Ok(json) = serde_json::to_string_pretty(self) {
            let _ = fs::write(path, json);
        }
    }
}

/// Explicit flag wins, then the saved preference, then the active simulator
fn resolve_target(flag: Option<&str>, settings: &Settings) -> DeviceTarget {
    match flag.or(settings.device.as_deref()) {
        Some(raw) => DeviceTarget::parse(raw),
        None => DeviceTarget::Booted,
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Devices => run_devices().await,
        Command::Set {
            latitude,
            longitude,
            device,
        } => run_set(&latitude, &longitude, device).await,
        Command::Play {
            file,
            device,
            speed,
        } => run_play(&file, device, speed).await,
    }
}

async fn run_devices() -> anyhow::Result<()> {
    let runner = ProcessRunner::xcrun();
    let devices = match list_devices(&runner).await {
        Ok(devices) => devices,
        Err(err) => {
            warn!("device listing unavailable: {}", err);
            Vec::new()
        }
    };

    if devices.is_empty() {
        println!("No available simulator devices found.");
        return Ok(());
    }

    let default_udid = pick_default(&devices).map(|d| d.udid.clone());
    for device in &devices {
        let marker = if Some(&device.udid) == default_udid.as_ref() {
            "*"
        } else {
            " "
        };
        println!(
            "{} {:<28} {:<38} {:<10} {}",
            marker, device.name, device.udid, device.state, device.runtime
        );
    }
    Ok(())
}

async fn run_set(latitude: &str, longitude: &str, device: Option<String>) -> anyhow::Result<()> {
    let mut settings = Settings::load();
    let target = resolve_target(device.as_deref(), &settings);
    if device.is_some() {
        settings.device = device;
        settings.save();
    }

    let engine = PlaybackEngine::new(Arc::new(ProcessRunner::xcrun()));
    engine.set_target(target.clone()).await;
    engine.set_manual_coordinate(latitude, longitude).await;
    engine.start().await?;

    println!("Location of {} set to {},{}", target, latitude, longitude);
    Ok(())
}

async fn run_play(file: &Path, device: Option<String>, speed: Option<f64>) -> anyhow::Result<()> {
    let mut settings = Settings::load();
    let target = resolve_target(device.as_deref(), &settings);
    let chosen_speed = speed.or(settings.speed).unwrap_or(1.0);
    if device.is_some() || speed.is_some() {
        if device.is_some() {
            settings.device = device;
        }
        if speed.is_some() {
            settings.speed = speed;
        }
        settings.save();
    }

    let track = load_track(file)?;
    if track.is_empty() {
        bail!("{} contains no track points", file.display());
    }

    let engine = PlaybackEngine::new(Arc::new(ProcessRunner::xcrun()));
    engine.set_target(target).await;
    engine.set_speed(chosen_speed).await;
    engine.load_track(track).await;
    let mut events = engine.subscribe().await;

    let snapshot = engine.snapshot().await;
    println!(
        "Playing {} points to {} at {:.1}x",
        snapshot.total, snapshot.target, snapshot.speed
    );
    println!("Controls: p pause, r resume, + / - speed, q quit");

    engine.start().await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                engine.stop().await;
                println!("\nStopped.");
                break;
            }
            line = lines.next_line(), if stdin_open => {
                match line {
                    Ok(Some(text)) => {
                        if handle_key(text.trim(), &engine).await {
                            break;
                        }
                    }
                    Ok(None) => stdin_open = false,
                    Err(err) => {
                        warn!("stdin error: {}", err);
                        stdin_open = false;
                    }
                }
            }
            event = events.recv() => {
                match event {
                    Some(PlaybackEvent::Tick { index, total, coordinate }) => {
                        println!("[{}/{}] {}", index + 1, total, coordinate);
                    }
                    Some(PlaybackEvent::CommandFailed { index, message }) => {
                        eprintln!("point {} failed: {}", index + 1, message);
                    }
                    Some(PlaybackEvent::Completed) => {
                        println!("Track complete.");
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    Ok(())
}

/// Apply one interactive command; returns true when the session should end
async fn handle_key(input: &str, engine: &PlaybackEngine) -> bool {
    match input {
        "p" => {
            engine.pause().await;
            println!("Status: {}", engine.snapshot().await.status);
        }
        "r" => {
            if let Err(err) = engine.start().await {
                eprintln!("resume failed: {}", err);
            } else {
                println!("Status: {}", engine.snapshot().await.status);
            }
        }
        "+" => {
            let doubled = engine.snapshot().await.speed * 2.0;
            engine.set_speed(doubled).await;
            println!("Speed: {:.1}x", engine.snapshot().await.speed);
        }
        "-" => {
            let halved = engine.snapshot().await.speed / 2.0;
            engine.set_speed(halved).await;
            println!("Speed: {:.1}x", engine.snapshot().await.speed);
        }
        "q" => {
            engine.stop().await;
            return true;
        }
        "" => {}
        _ => println!("Commands: p pause, r resume, + / - speed, q quit"),
    }
    false
}
