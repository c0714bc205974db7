//! Frame consumers: display and recording collaborators.

use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::trace::{debug, info};
use crate::video::Frame;

/// Decodes and shows frames.
///
/// Implemented by the windowing side; errors are reported by the station and
/// the loop moves on to the next frame.
pub trait FrameSink {
    type Error: fmt::Display;

    fn present(&mut self, frame: &Frame) -> Result<(), Self::Error>;
}

/// Writes frames into a local recording.
pub trait FrameRecorder {
    fn record(&mut self, frame: &Frame) -> io::Result<()>;

    /// Flushes and closes the recording.
    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Headless sink that logs each frame instead of drawing it.
#[derive(Debug, Default)]
pub struct LogSink {
    presented: u64,
}

impl LogSink {
    #[must_use]
    pub const fn presented(&self) -> u64 {
        self.presented
    }
}

impl FrameSink for LogSink {
    type Error = std::convert::Infallible;

    fn present(&mut self, _frame: &Frame) -> Result<(), Self::Error> {
        self.presented += 1;
        debug!(
            n = self.presented,
            len = _frame.len(),
            terminated = _frame.is_terminated(),
            "frame"
        );
        Ok(())
    }
}

/// Records frames back to back into one file.
///
/// Concatenated JPEG images form a Motion-JPEG stream most players accept.
pub struct MjpegRecorder {
    out: BufWriter<File>,
    frames: u64,
}

impl MjpegRecorder {
    /// Creates (or truncates) the recording file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created.
    pub fn create(path: &Path) -> io::Result<Self> {
        let file = File::create(path)?;
        info!(path = %path.display(), "recording to file");
        Ok(Self {
            out: BufWriter::new(file),
            frames: 0,
        })
    }

    #[must_use]
    pub const fn frames(&self) -> u64 {
        self.frames
    }
}

impl FrameRecorder for MjpegRecorder {
    fn record(&mut self, frame: &Frame) -> io::Result<()> {
        self.out.write_all(frame.as_bytes())?;
        self.frames += 1;
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_sink_counts() {
        let mut sink = LogSink::default();
        sink.present(&Frame::from(&b"\xff\xd8\xff\xff\xd9"[..])).unwrap();
        sink.present(&Frame::from(&b"\xff\xd8\xff"[..])).unwrap();
        assert_eq!(sink.presented(), 2);
    }

    #[test]
    fn mjpeg_recorder_concatenates_frames() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flight.mjpeg");
        let mut recorder = MjpegRecorder::create(&path).unwrap();
        recorder.record(&Frame::from(&b"\xff\xd8\xffA\xff\xd9"[..])).unwrap();
        recorder.record(&Frame::from(&b"\xff\xd8\xffB\xff\xd9"[..])).unwrap();
        recorder.finish().unwrap();

        assert_eq!(recorder.frames(), 2);
        assert_eq!(
            std::fs::read(&path).unwrap(),
            b"\xff\xd8\xffA\xff\xd9\xff\xd8\xffB\xff\xd9"
        );
    }
}
