//! Marker-driven frame reassembly.
//!
//! The camera sends each JPEG as raw byte fragments with no header, length
//! or sequence number. Frames are recovered by scanning every datagram for
//! the JPEG start marker (`FF D8 FF`, first occurrence) and end marker
//! (`FF D9`, last occurrence) and accumulating the bytes in between.
//!
//! # Rules
//!
//! For each datagram, in order:
//!
//! 1. **Start marker present.** If the accumulation buffer holds a frame in
//!    progress, that frame is closed: by the datagram's end marker when the
//!    end marker precedes the start marker, otherwise implicitly by the new
//!    start marker (its end-marker packet was lost). The buffer then restarts
//!    at the new start marker. A buffer holding garbage is simply replaced.
//! 2. **Start marker absent.** The whole datagram is appended.
//! 3. **End marker present and still open.** Everything up to and including
//!    it is split off the buffer and emitted if the buffer was synchronized,
//!    or reported as an invalid frame otherwise. The remainder stays buffered.
//!
//! A closed span containing an end marker immediately followed by a start
//! marker holds more than one image; it is emitted as one frame per image.
//!
//! # Memory
//!
//! ```text
//! Reassembler
//! └── buffer: BytesMut   (grows while a frame is in flight)
//!     └── split_to(n).freeze() ──> Frame(Bytes)   (no copy)
//! ```
//!
//! Malformed input never fails; it degrades to an invalid-frame report and
//! resynchronizes on the next start marker.

use bytes::BytesMut;

use crate::trace::{debug, trace, warn};

use super::Frame;
use super::marker::{self, END_MARKER};

/// Initial capacity of the accumulation buffer (one VGA JPEG fits).
pub const DEFAULT_BUFFER_CAPACITY: usize = 128 * 1024;

/// Buffered bytes beyond which an unterminated frame is abandoned.
pub const DEFAULT_MAX_BUFFERED: usize = 8 * 1024 * 1024;

/// What a single [`Reassembler::push`] produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PushOutcome {
    /// Frames handed to the emit callback.
    pub frames: usize,
    /// Closed spans that did not begin with a start marker.
    pub invalid: usize,
    /// True if the buffer was abandoned for exceeding its size limit.
    pub overflowed: bool,
}

/// Stateful scanner turning datagrams into frames.
///
/// Owns the accumulation buffer for the whole session. It is moved into the
/// RX thread and never shared.
#[derive(Debug)]
pub struct Reassembler {
    buffer: BytesMut,
    max_buffered: usize,
}

impl Default for Reassembler {
    fn default() -> Self {
        Self::new()
    }
}

impl Reassembler {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUFFER_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
            max_buffered: DEFAULT_MAX_BUFFERED,
        }
    }

    /// Sets the buffered-bytes limit. A frame growing past it is dropped.
    #[must_use]
    pub const fn max_buffered(mut self, limit: usize) -> Self {
        self.max_buffered = limit;
        self
    }

    /// Bytes currently held for the frame in progress.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// True if the buffer begins with a start marker, i.e. holds a frame in
    /// progress rather than garbage.
    #[must_use]
    pub fn is_synchronized(&self) -> bool {
        marker::starts_with_start(&self.buffer)
    }

    /// Discards any partial frame.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Consumes one datagram, calling `emit` for every frame it completes, in
    /// arrival order.
    pub fn push(&mut self, datagram: &[u8], mut emit: impl FnMut(Frame)) -> PushOutcome {
        let mut outcome = PushOutcome::default();
        let start = marker::find_start(datagram);
        let mut end = marker::rfind_end(datagram);

        // Where the retained part of the datagram begins, and where it landed
        // in the buffer.
        let (from, at) = if let Some(start) = start {
            if self.is_synchronized() {
                match end {
                    Some(e) if e < start => {
                        self.buffer
                            .extend_from_slice(&datagram[..e + END_MARKER.len()]);
                        end = None;
                    }
                    _ => {
                        trace!(buffered = self.buffer.len(), "closing frame at next start marker");
                        self.buffer.extend_from_slice(&datagram[..start]);
                    }
                }
                let closed = self.buffer.split();
                Self::emit_span(closed, &mut emit, &mut outcome);
            } else if !self.buffer.is_empty() {
                debug!(discarded = self.buffer.len(), "resynchronized on start marker");
            }
            self.buffer.clear();
            self.buffer.extend_from_slice(&datagram[start..]);
            (start, 0)
        } else {
            let at = self.buffer.len();
            self.buffer.extend_from_slice(datagram);
            (0, at)
        };

        if let Some(e) = end {
            if e < from {
                // The end marker sat in bytes dropped by the resync: it closed
                // a frame whose start was never seen.
                warn!(offset = e, "invalid frame: end marker without start");
                outcome.invalid += 1;
            } else {
                let eob = at + (e - from) + END_MARKER.len();
                let closed = self.buffer.split_to(eob);
                Self::emit_span(closed, &mut emit, &mut outcome);
            }
        }

        if self.buffer.len() > self.max_buffered {
            warn!(
                buffered = self.buffer.len(),
                limit = self.max_buffered,
                "frame exceeds buffer limit, dropping"
            );
            self.buffer.clear();
            outcome.overflowed = true;
        }

        outcome
    }

    /// Emits every image in a closed span, splitting at frame boundaries.
    fn emit_span(
        span: BytesMut,
        emit: &mut impl FnMut(Frame),
        outcome: &mut PushOutcome,
    ) {
        let mut rest = span.freeze();
        while !rest.is_empty() {
            let piece = match marker::next_boundary(&rest) {
                Some(at) => rest.split_to(at),
                None => std::mem::take(&mut rest),
            };
            if marker::starts_with_start(&piece) {
                trace!(len = piece.len(), "frame complete");
                outcome.frames += 1;
                emit(Frame::new(piece));
            } else {
                warn!(len = piece.len(), "invalid frame: missing start marker");
                outcome.invalid += 1;
            }
        }
    }
}
