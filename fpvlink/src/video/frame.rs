//! Reassembled JPEG frame.

use std::ops::Deref;

use bytes::Bytes;

use super::marker;

/// One complete JPEG image as reassembled from the datagram stream.
///
/// Backed by [`Bytes`], so handing a frame from the RX thread to the station
/// loop moves a reference-counted view of the reassembly buffer instead of
/// copying the image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame(Bytes);

impl Frame {
    #[must_use]
    pub const fn new(bytes: Bytes) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        self.0
    }

    /// True if the frame ends with an end-of-image marker.
    ///
    /// Frames closed implicitly by the next start marker usually do not.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.0.ends_with(&marker::END_MARKER)
    }
}

impl Deref for Frame {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Frame {
    fn from(bytes: Vec<u8>) -> Self {
        Self(Bytes::from(bytes))
    }
}

impl From<&'static [u8]> for Frame {
    fn from(bytes: &'static [u8]) -> Self {
        Self(Bytes::from_static(bytes))
    }
}
