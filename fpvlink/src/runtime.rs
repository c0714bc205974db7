//! Station runtime: the foreground consume loop and its collaborators.

mod record;
mod sink;
mod station;

pub use record::RecordPacer;
pub use sink::{FrameRecorder, FrameSink, LogSink, MjpegRecorder};
pub use station::{Cycle, Recording, Station, StationError};
