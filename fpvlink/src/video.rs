//! Video path: datagrams in, JPEG frames out.
//!
//! - `marker`: JPEG start/end marker scanning.
//! - `frame`: the reassembled [`Frame`] handed to the station loop.
//! - `reassembly`: the marker-driven [`Reassembler`] state machine.
//! - `listener`: the RX loop owning the video socket and sending keepalives.
//! - `stats`: counters and the once-per-second rate report.

pub mod frame;
pub mod listener;
pub mod marker;
pub mod reassembly;
pub mod stats;

pub use frame::Frame;
pub use listener::{Listener, Step};
pub use reassembly::{PushOutcome, Reassembler};
pub use stats::StreamStats;
