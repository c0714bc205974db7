//! Low-latency FPV link between a camera vehicle and an operator station.
//!
//! The vehicle streams JPEG frames as raw UDP fragments with no framing of
//! its own; the station rebuilds frames from the JPEG start/end markers,
//! hands the newest one to a foreground loop for display, and sends
//! controller commands back at a fixed cadence.
//!
//! - [`video`]: reassembly and the background RX loop.
//! - [`sync`]: the bounded newest-wins hand-off and cancellation.
//! - [`command`]: controller sampling and the `[RRR;LLL;HHH]|` message.
//! - [`runtime`]: the [`Station`](runtime::Station) tying both paths together.
//! - [`sim`]: the vehicle side, for demos and tests.

pub mod command;
pub mod config;
pub mod net;
pub mod runtime;
pub mod sim;
pub mod sync;
pub mod video;

mod trace;

pub use trace::init_tracing;
