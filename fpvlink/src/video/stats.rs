//! RX counters and throughput reporting.

use std::time::Duration;

use minstant::Instant;

/// Interval between throughput reports.
pub const REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// Cumulative counters for one listener session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub datagrams: u64,
    pub bytes: u64,
    /// Frames admitted to the hand-off queue.
    pub frames: u64,
    /// Closed spans discarded for lacking a start marker.
    pub invalid: u64,
    /// Frames dropped because the queue stayed full for the admission wait.
    pub dropped: u64,
    /// Partial frames abandoned for exceeding the buffer limit.
    pub overflows: u64,
    pub keepalives: u64,
}

/// Frame and bit rate over one report window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rate {
    pub fps: f64,
    pub mbps: f64,
}

/// Accumulates frames and bytes and yields a [`Rate`] once per interval.
#[derive(Debug)]
pub struct RateMeter {
    window_start: Instant,
    interval: Duration,
    frames: u64,
    bytes: u64,
}

impl RateMeter {
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self::starting_at(Instant::now(), interval)
    }

    #[must_use]
    pub const fn starting_at(now: Instant, interval: Duration) -> Self {
        Self {
            window_start: now,
            interval,
            frames: 0,
            bytes: 0,
        }
    }

    pub fn record(&mut self, frames: u64, bytes: u64) {
        self.frames += frames;
        self.bytes += bytes;
    }

    /// Closes the window if more than one interval elapsed, returning the
    /// rates scaled to one second.
    pub fn tick(&mut self, now: Instant) -> Option<Rate> {
        let elapsed = now.checked_duration_since(self.window_start)?;
        if elapsed <= self.interval {
            return None;
        }
        let secs = elapsed.as_secs_f64();
        #[allow(clippy::cast_precision_loss)]
        let rate = Rate {
            fps: self.frames as f64 / secs,
            mbps: (self.bytes as f64 * 8.0) / secs / (1024.0 * 1024.0),
        };
        self.window_start = now;
        self.frames = 0;
        self.bytes = 0;
        Some(rate)
    }
}
