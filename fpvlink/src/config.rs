//! Link and station configuration.
//!
//! Defaults carry the wire constants the vehicle firmware expects. A TOML
//! file may override any field; missing fields keep their defaults.
//!
//! ```toml
//! target = "192.168.4.1"
//! process_every_frame = false
//!
//! [link]
//! listen = "0.0.0.0:55556"
//! command_period_ms = 100
//!
//! [record]
//! path = "flight.mjpeg"
//! fps = 30
//! ```

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::net::Endpoint;

/// Port the station receives video on.
pub const VIDEO_PORT: u16 = 55556;

/// Port the vehicle listens on for the keepalive/trigger byte.
pub const KEEPALIVE_PORT: u16 = 55555;

/// Port the vehicle listens on for command messages.
pub const COMMAND_PORT: u16 = 3197;

/// Keepalive sentinel sent on every receive timeout.
pub const KEEPALIVE_BYTE: u8 = 0x55;

/// Largest datagram the listener reads.
pub const MAX_DATAGRAM_SIZE: usize = 64 * 1024;

/// Default hand-off capacity, in frames.
pub const FRAME_QUEUE_CAPACITY: usize = 32;

/// Default recording frame rate.
pub const DEFAULT_RECORD_FPS: u32 = 60;

/// Error loading a configuration file or resolving its addresses.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("no target vehicle configured")]
    MissingTarget,
    #[error("failed to resolve target {host}: {source}")]
    Resolve {
        host: String,
        source: std::io::Error,
    },
    #[error("recording frame rate must be greater than 0")]
    ZeroFps,
}

/// Network parameters shared by both directions of the link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Local address the video socket binds to.
    pub listen: SocketAddr,
    /// Vehicle port receiving the keepalive byte.
    pub keepalive_port: u16,
    /// Vehicle port receiving command messages.
    pub command_port: u16,
    /// Video socket read timeout; also the keepalive period under silence.
    pub read_timeout_ms: u64,
    /// How long a completed frame may wait for room in the hand-off.
    pub admit_timeout_ms: u64,
    /// How long the station waits for a frame each cycle.
    pub take_timeout_ms: u64,
    /// Command send cadence.
    pub command_period_ms: u64,
    /// Hand-off capacity, in frames.
    pub queue_capacity: usize,
    /// Kernel receive buffer requested for the video socket.
    pub recv_buffer_size: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            listen: Endpoint::any(VIDEO_PORT).as_socket_addr(),
            keepalive_port: KEEPALIVE_PORT,
            command_port: COMMAND_PORT,
            read_timeout_ms: 1000,
            admit_timeout_ms: 1000,
            take_timeout_ms: 1000,
            command_period_ms: 100,
            queue_capacity: FRAME_QUEUE_CAPACITY,
            recv_buffer_size: 4 * 1024 * 1024,
        }
    }
}

impl LinkConfig {
    #[must_use]
    pub const fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    #[must_use]
    pub const fn admit_timeout(&self) -> Duration {
        Duration::from_millis(self.admit_timeout_ms)
    }

    #[must_use]
    pub const fn take_timeout(&self) -> Duration {
        Duration::from_millis(self.take_timeout_ms)
    }

    #[must_use]
    pub const fn command_period(&self) -> Duration {
        Duration::from_millis(self.command_period_ms)
    }

    #[must_use]
    pub fn listen_endpoint(&self) -> Endpoint {
        Endpoint::from(self.listen)
    }
}

/// Local recording parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordConfig {
    pub path: PathBuf,
    #[serde(default = "default_fps")]
    pub fps: u32,
}

const fn default_fps() -> u32 {
    DEFAULT_RECORD_FPS
}

impl RecordConfig {
    /// Interval between recorded frames.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroFps`] if `fps` is zero.
    pub fn interval(&self) -> Result<Duration, ConfigError> {
        if self.fps == 0 {
            return Err(ConfigError::ZeroFps);
        }
        Ok(Duration::from_secs(1) / self.fps)
    }
}

/// Everything the operator station needs to start.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StationConfig {
    /// Vehicle host name or IP address.
    pub target: Option<String>,
    /// Ask the display to go fullscreen.
    pub fullscreen: bool,
    /// Present every frame instead of only the newest under backlog.
    pub process_every_frame: bool,
    pub record: Option<RecordConfig>,
    pub link: LinkConfig,
}

impl StationConfig {
    /// Loads a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Resolves the configured target to an address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingTarget`] if no target is set, or
    /// [`ConfigError::Resolve`] if the lookup fails.
    pub fn target_ip(&self) -> Result<IpAddr, ConfigError> {
        let host = self.target.as_deref().ok_or(ConfigError::MissingTarget)?;
        Endpoint::resolve(host, self.link.keepalive_port)
            .map(|ep| ep.ip())
            .map_err(|source| ConfigError::Resolve {
                host: host.to_owned(),
                source,
            })
    }
}
