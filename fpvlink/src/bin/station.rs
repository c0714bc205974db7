//! Operator station.
//!
//! Receives the vehicle's video, presents frames, and streams controller
//! commands back. Without a display or joystick backend compiled in, frames
//! go to the log and the controller stays centred.
//!
//! # Usage
//!
//! ```sh
//! fpvlink-station 192.168.4.1 --write flight.mjpeg --fps 30
//! ```
//!
//! # Signals
//!
//! - `SIGTERM` / `SIGINT`: Graceful shutdown

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

use fpvlink::command::NeutralController;
use fpvlink::config::{ConfigError, DEFAULT_RECORD_FPS, RecordConfig, StationConfig};
use fpvlink::runtime::{LogSink, Recording, Station, StationError};

#[derive(Debug, Parser)]
#[command(name = "fpvlink-station", version, about = "FPV video receiver and controller")]
struct Cli {
    /// Vehicle host name or IP address.
    target: Option<String>,

    /// Open the video window fullscreen.
    #[arg(long)]
    fullscreen: bool,

    /// Record the stream to this file.
    #[arg(long, value_name = "PATH")]
    write: Option<PathBuf>,

    /// Recording frame rate.
    #[arg(long, default_value_t = DEFAULT_RECORD_FPS)]
    fps: u32,

    /// Present every frame instead of only the newest.
    #[arg(long)]
    grab_all: bool,

    /// Local address for the video socket.
    #[arg(long, value_name = "ADDR")]
    listen: Option<SocketAddr>,

    /// TOML file with defaults for everything above.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Station(#[from] StationError),
    #[error("failed to install signal handler: {0}")]
    Signal(#[from] ctrlc::Error),
}

fn main() {
    fpvlink::init_tracing();
    if let Err(e) = run(Cli::parse()) {
        eprintln!("fpvlink-station: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Error> {
    let config = merge(&cli)?;
    let recording = config
        .record
        .as_ref()
        .map(Recording::from_config)
        .transpose()?;

    let mut station = Station::spawn(
        &config,
        LogSink::default(),
        NeutralController::gamepad(),
        recording,
    )?;

    let cancel = station.cancel_token();
    ctrlc::set_handler(move || cancel.cancel())?;

    eprintln!(
        "fpvlink-station: receiving on {}, commanding {}",
        station.video_addr(),
        station.command_target()
    );
    station.run();

    eprintln!("fpvlink-station: shutting down...");
    if let Some(stats) = station.shutdown() {
        eprintln!(
            "fpvlink-station: {} frames, {} invalid, {} dropped",
            stats.frames, stats.invalid, stats.dropped
        );
    }
    Ok(())
}

/// Layers command-line flags over the config file (or the defaults).
fn merge(cli: &Cli) -> Result<StationConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => StationConfig::load(path)?,
        None => StationConfig::default(),
    };
    if let Some(target) = &cli.target {
        config.target = Some(target.clone());
    }
    config.fullscreen |= cli.fullscreen;
    config.process_every_frame |= cli.grab_all;
    if let Some(path) = &cli.write {
        config.record = Some(RecordConfig {
            path: path.clone(),
            fps: cli.fps,
        });
    }
    if let Some(listen) = cli.listen {
        config.link.listen = listen;
    }
    Ok(config)
}
