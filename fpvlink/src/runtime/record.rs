//! Recording cadence.

use std::time::Duration;

use minstant::Instant;

/// Gates recorder writes to a fixed frame rate.
///
/// Each firing schedules the next one exactly one interval later, so a slow
/// display loop never stretches the recording's timeline; it repeats frames
/// until it catches up instead.
#[derive(Debug)]
pub struct RecordPacer {
    interval: Duration,
    next: Instant,
}

impl RecordPacer {
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self::starting_at(Instant::now(), interval)
    }

    #[must_use]
    pub const fn starting_at(now: Instant, interval: Duration) -> Self {
        Self {
            interval,
            next: now,
        }
    }

    /// Time left until the next frame is due; zero when already due.
    #[must_use]
    pub fn until_due(&self, now: Instant) -> Duration {
        self.next.checked_duration_since(now).unwrap_or(Duration::ZERO)
    }

    /// Returns true if a frame should be recorded at `now`.
    pub fn poll(&mut self, now: Instant) -> bool {
        if now >= self.next {
            self.next = self.next + self.interval;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_per_interval() {
        let t0 = Instant::now();
        let mut pacer = RecordPacer::starting_at(t0, Duration::from_millis(20));
        assert!(pacer.poll(t0));
        assert!(!pacer.poll(t0 + Duration::from_millis(10)));
        assert!(pacer.poll(t0 + Duration::from_millis(20)));
        assert!(!pacer.poll(t0 + Duration::from_millis(30)));
    }

    #[test]
    fn until_due_counts_down_to_zero() {
        let t0 = Instant::now();
        let mut pacer = RecordPacer::starting_at(t0, Duration::from_millis(30));
        assert_eq!(pacer.until_due(t0), Duration::ZERO);
        assert!(pacer.poll(t0));
        assert_eq!(pacer.until_due(t0), Duration::from_millis(30));
        assert_eq!(pacer.until_due(t0 + Duration::from_millis(20)), Duration::from_millis(10));
        assert_eq!(pacer.until_due(t0 + Duration::from_millis(45)), Duration::ZERO);
    }

    #[test]
    fn catches_up_one_frame_per_poll() {
        let t0 = Instant::now();
        let mut pacer = RecordPacer::starting_at(t0, Duration::from_millis(10));
        let late = t0 + Duration::from_millis(35);
        let fired = (0..6).filter(|_| pacer.poll(late)).count();
        assert_eq!(fired, 4);
    }
}
