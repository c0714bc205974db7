//! Simulated vehicle.
//!
//! Waits for a station's trigger byte, then streams a JPEG file (or a
//! synthetic frame) to it at a fixed rate and logs every command received.
//!
//! # Usage
//!
//! ```sh
//! fpvlink-vehicle-sim --jpeg test.jpg --fps 30
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use clap::Parser;
use minstant::Instant;

use fpvlink::command::CommandError;
use fpvlink::config::{COMMAND_PORT, KEEPALIVE_PORT, VIDEO_PORT};
use fpvlink::net::Endpoint;
use fpvlink::sim::{CommandReceiver, VehicleSim, synthetic_frame};
use fpvlink::sync::CancelToken;

#[derive(Debug, Parser)]
#[command(name = "fpvlink-vehicle-sim", version, about = "Stand-in for the camera vehicle")]
struct Cli {
    /// Address receiving the station's trigger byte.
    #[arg(long, default_value_t = Endpoint::any(KEEPALIVE_PORT).as_socket_addr())]
    trigger: SocketAddr,

    /// Address receiving command messages.
    #[arg(long, default_value_t = Endpoint::any(COMMAND_PORT).as_socket_addr())]
    command: SocketAddr,

    /// Station port video is sent to.
    #[arg(long, default_value_t = VIDEO_PORT)]
    video_port: u16,

    /// JPEG to stream; a synthetic frame is generated when absent.
    #[arg(long, value_name = "PATH")]
    jpeg: Option<PathBuf>,

    /// Size of the synthetic frame in bytes.
    #[arg(long, default_value_t = 48 * 1024)]
    frame_size: usize,

    /// Frames per second.
    #[arg(long, default_value_t = 30)]
    fps: u32,
}

#[derive(Debug, thiserror::Error)]
enum Error {
    #[error("failed to read {path}: {source}")]
    Jpeg {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to install signal handler: {0}")]
    Signal(#[from] ctrlc::Error),
    #[error("frame rate must be greater than 0")]
    ZeroFps,
}

fn main() {
    fpvlink::init_tracing();
    if let Err(e) = run(&Cli::parse()) {
        eprintln!("fpvlink-vehicle-sim: {e}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), Error> {
    if cli.fps == 0 {
        return Err(Error::ZeroFps);
    }
    let frame = match &cli.jpeg {
        Some(path) => std::fs::read(path).map_err(|source| Error::Jpeg {
            path: path.clone(),
            source,
        })?,
        None => synthetic_frame(0, cli.frame_size.max(5)),
    };

    let cancel = CancelToken::new();
    let handler_cancel = cancel.clone();
    ctrlc::set_handler(move || handler_cancel.cancel())?;

    let mut commands = CommandReceiver::bind(Endpoint::from(cli.command))?;
    let command_cancel = cancel.clone();
    let command_thread = thread::Builder::new()
        .name("fpvlink-sim-cmd".into())
        .spawn(move || {
            while !command_cancel.is_cancelled() {
                match commands.recv(Duration::from_millis(200)) {
                    Ok(Some(msg)) => eprintln!("fpvlink-vehicle-sim: command {msg}"),
                    Ok(None) => {}
                    Err(CommandError::Malformed(why)) => {
                        eprintln!("fpvlink-vehicle-sim: ignoring bad command ({why})");
                    }
                    Err(e) => {
                        eprintln!("fpvlink-vehicle-sim: {e}");
                        break;
                    }
                }
            }
        })?;

    let mut sim = VehicleSim::bind(Endpoint::from(cli.trigger), cli.video_port)?;
    eprintln!(
        "fpvlink-vehicle-sim: waiting for trigger on {}",
        sim.local_addr()?
    );
    while !cancel.is_cancelled() && sim.wait_for_trigger(Duration::from_millis(200))?.is_none() {}

    let interval = Duration::from_secs(1) / cli.fps;
    let mut next = Instant::now();
    while !cancel.is_cancelled() {
        sim.poll_trigger()?;
        sim.stream_frame(&frame)?;
        next = next + interval;
        if let Some(wait) = next.checked_duration_since(Instant::now()) {
            thread::sleep(wait);
        } else {
            next = Instant::now();
        }
    }

    let _ = command_thread.join();
    eprintln!(
        "fpvlink-vehicle-sim: sent {} frames, dropped {}",
        sim.frames_sent(),
        sim.frames_dropped()
    );
    Ok(())
}
