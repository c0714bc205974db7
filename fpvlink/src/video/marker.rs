//! JPEG marker scanning.
//!
//! The video stream carries no framing of its own; frame boundaries are found
//! by looking for the JPEG start-of-image and end-of-image markers inside
//! each datagram.

/// Start-of-image marker followed by the first byte of the next segment.
pub const START_MARKER: [u8; 3] = [0xFF, 0xD8, 0xFF];

/// End-of-image marker.
pub const END_MARKER: [u8; 2] = [0xFF, 0xD9];

/// An end marker directly followed by a start marker: one frame ends and the
/// next begins within the same span.
const BOUNDARY: [u8; 5] = [0xFF, 0xD9, 0xFF, 0xD8, 0xFF];

/// Index of the first start marker in `data`.
#[must_use]
pub fn find_start(data: &[u8]) -> Option<usize> {
    data.windows(START_MARKER.len())
        .position(|w| w == START_MARKER)
}

/// Index of the last end marker in `data`.
///
/// Earlier candidates may be payload bytes; only the last one is trusted to
/// close a frame.
#[must_use]
pub fn rfind_end(data: &[u8]) -> Option<usize> {
    data.windows(END_MARKER.len())
        .rposition(|w| w == END_MARKER)
}

/// True if `data` begins with the start marker.
#[must_use]
pub fn starts_with_start(data: &[u8]) -> bool {
    data.starts_with(&START_MARKER)
}

/// Offset just past the end marker of the first frame boundary in `data`,
/// i.e. where the next frame's start marker begins.
#[must_use]
pub fn next_boundary(data: &[u8]) -> Option<usize> {
    data.windows(BOUNDARY.len())
        .position(|w| w == BOUNDARY)
        .map(|at| at + END_MARKER.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_is_first_occurrence() {
        let data = [0x00, 0xFF, 0xD8, 0xFF, 0x11, 0xFF, 0xD8, 0xFF];
        assert_eq!(find_start(&data), Some(1));
    }

    #[test]
    fn end_is_last_occurrence() {
        let data = [0xFF, 0xD9, 0x42, 0xFF, 0xD9, 0x00];
        assert_eq!(rfind_end(&data), Some(3));
    }

    #[test]
    fn short_or_missing_markers() {
        assert_eq!(find_start(&[0xFF, 0xD8]), None);
        assert_eq!(rfind_end(&[0xFF]), None);
        assert_eq!(find_start(&[]), None);
        assert!(!starts_with_start(&[0xFF, 0xD8]));
    }

    #[test]
    fn boundary_points_at_next_start() {
        let data = [0xFF, 0xD8, 0xFF, 0x01, 0xFF, 0xD9, 0xFF, 0xD8, 0xFF, 0x02];
        assert_eq!(next_boundary(&data), Some(6));
        assert!(starts_with_start(&data[6..]));
    }

    #[test]
    fn lone_end_marker_is_not_a_boundary() {
        let data = [0xFF, 0xD8, 0xFF, 0xFF, 0xD9, 0x07, 0xFF, 0xD9];
        assert_eq!(next_boundary(&data), None);
    }
}
