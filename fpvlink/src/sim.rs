//! Vehicle side of the link, for demos and loopback tests.
//!
//! The vehicle stays silent until a trigger byte arrives on its keepalive
//! port. The sender of that byte becomes the video peer and every frame is
//! cut into datagrams no larger than [`MAX_CHUNK`] and sent to the peer's
//! video port. Later keepalives re-learn the peer, so a station that
//! restarts on a new address is picked up again.

use std::io;
use std::time::Duration;

use minstant::Instant;

use crate::command::message::MESSAGE_LEN;
use crate::command::{CommandError, CommandMessage};
use crate::config::KEEPALIVE_BYTE;
use crate::net::{Endpoint, PolledSocket};
use crate::trace::{debug, info};
use crate::video::marker::{END_MARKER, START_MARKER};

/// Largest video datagram the vehicle sends.
pub const MAX_CHUNK: usize = 32 * 1024;

/// Simulated camera.
pub struct VehicleSim {
    socket: PolledSocket,
    video_port: Option<u16>,
    chunk: usize,
    peer: Option<Endpoint>,
    frames_sent: u64,
    frames_dropped: u64,
}

impl VehicleSim {
    /// Binds the trigger socket. Video goes out from the same socket to
    /// `video_port` on whichever host triggers it.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be bound.
    pub fn bind(trigger: Endpoint, video_port: u16) -> io::Result<Self> {
        Ok(Self {
            socket: PolledSocket::bind(trigger)?,
            video_port: Some(video_port),
            chunk: MAX_CHUNK,
            peer: None,
            frames_sent: 0,
            frames_dropped: 0,
        })
    }

    /// Sends video back to the port the trigger came from.
    ///
    /// The station sends keepalives from its video socket, so this finds the
    /// station without knowing its video port up front.
    #[must_use]
    pub fn reply_to_sender(mut self) -> Self {
        self.video_port = None;
        self
    }

    /// Caps datagrams at `chunk` bytes instead of [`MAX_CHUNK`].
    ///
    /// # Panics
    ///
    /// Panics if `chunk` is zero.
    #[must_use]
    pub fn chunk_size(mut self, chunk: usize) -> Self {
        assert!(chunk > 0, "chunk size must be non-zero");
        self.chunk = chunk;
        self
    }

    /// Address of the trigger socket.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be read from the socket.
    pub fn local_addr(&self) -> io::Result<Endpoint> {
        self.socket.socket().local_addr()
    }

    /// Where video is currently sent, once triggered.
    #[must_use]
    pub const fn peer(&self) -> Option<Endpoint> {
        self.peer
    }

    #[must_use]
    pub const fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    /// Frames abandoned by [`VehicleSim::stream_frame`].
    #[must_use]
    pub const fn frames_dropped(&self) -> u64 {
        self.frames_dropped
    }

    /// Waits up to `timeout` for a trigger byte and returns the new peer.
    ///
    /// Datagrams that do not start with the trigger byte are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket fails.
    pub fn wait_for_trigger(&mut self, timeout: Duration) -> io::Result<Option<Endpoint>> {
        let deadline = Instant::now() + timeout;
        let mut buf = [0u8; 64];
        loop {
            let remaining = deadline
                .checked_duration_since(Instant::now())
                .unwrap_or(Duration::ZERO);
            let Some((len, from)) = self.socket.recv_timeout(&mut buf, remaining)? else {
                return Ok(None);
            };
            if len > 0 && buf[0] == KEEPALIVE_BYTE {
                let peer = self.video_port.map_or(from, |port| from.with_port(port));
                if self.peer != Some(peer) {
                    info!(%peer, "video peer triggered");
                }
                self.peer = Some(peer);
                return Ok(Some(peer));
            }
            debug!(len, %from, "ignoring non-trigger datagram");
        }
    }

    /// Drains pending triggers without blocking.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket fails.
    pub fn poll_trigger(&mut self) -> io::Result<Option<Endpoint>> {
        let mut latest = None;
        while let Some(peer) = self.wait_for_trigger(Duration::ZERO)? {
            latest = Some(peer);
        }
        Ok(latest)
    }

    /// Sends one frame to the peer and returns the number of datagrams.
    ///
    /// # Errors
    ///
    /// Returns [`io::ErrorKind::NotConnected`] before the first trigger, or
    /// the socket error of a failed send.
    pub fn send_frame(&mut self, jpeg: &[u8]) -> io::Result<usize> {
        let peer = self
            .peer
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "no trigger received"))?;
        let mut datagrams = 0;
        for chunk in jpeg.chunks(self.chunk) {
            self.socket.send_to(chunk, peer)?;
            datagrams += 1;
        }
        self.frames_sent += 1;
        Ok(datagrams)
    }

    /// Like [`VehicleSim::send_frame`], but a full socket send buffer drops
    /// the rest of the frame instead of failing. Returns `None` for a
    /// dropped frame.
    ///
    /// # Errors
    ///
    /// Returns any send error other than `WouldBlock`.
    pub fn stream_frame(&mut self, jpeg: &[u8]) -> io::Result<Option<usize>> {
        let sent = drop_on_would_block(self.send_frame(jpeg))?;
        if sent.is_none() {
            self.frames_dropped += 1;
            debug!(len = jpeg.len(), "send buffer full, frame dropped");
        }
        Ok(sent)
    }
}

fn drop_on_would_block(result: io::Result<usize>) -> io::Result<Option<usize>> {
    match result {
        Ok(datagrams) => Ok(Some(datagrams)),
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
        Err(e) => Err(e),
    }
}

/// Receives command messages on the vehicle's command port.
pub struct CommandReceiver {
    socket: PolledSocket,
}

impl CommandReceiver {
    /// # Errors
    ///
    /// Returns an error if the socket cannot be bound.
    pub fn bind(endpoint: Endpoint) -> io::Result<Self> {
        Ok(Self {
            socket: PolledSocket::bind(endpoint)?,
        })
    }

    /// # Errors
    ///
    /// Returns an error if the address cannot be read from the socket.
    pub fn local_addr(&self) -> io::Result<Endpoint> {
        self.socket.socket().local_addr()
    }

    /// Waits up to `timeout` for one command.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Malformed`] if a datagram arrived but is not
    /// a command, or [`CommandError::Recv`] if the socket fails.
    pub fn recv(&mut self, timeout: Duration) -> Result<Option<CommandMessage>, CommandError> {
        let mut buf = [0u8; MESSAGE_LEN * 2];
        match self.socket.recv_timeout(&mut buf, timeout) {
            Ok(Some((len, _from))) => CommandMessage::parse(&buf[..len]).map(Some),
            Ok(None) => Ok(None),
            Err(e) => Err(CommandError::Recv(e)),
        }
    }
}

/// Builds a marker-delimited placeholder frame of `len` bytes.
///
/// The body never contains `0xFF`, so the frame has exactly one start and
/// one end marker. `seq` varies the body between frames.
///
/// # Panics
///
/// Panics if `len` is too short to hold both markers.
#[must_use]
pub fn synthetic_frame(seq: u32, len: usize) -> Vec<u8> {
    let overhead = START_MARKER.len() + END_MARKER.len();
    assert!(len >= overhead, "frame must fit both markers");
    let mut frame = Vec::with_capacity(len);
    frame.extend_from_slice(&START_MARKER);
    #[allow(clippy::cast_possible_truncation)]
    frame.extend((0..len - overhead).map(|i| ((i as u32).wrapping_add(seq) % 0xFF) as u8));
    frame.extend_from_slice(&END_MARKER);
    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::UdpSocket;
    use crate::video::marker;

    #[test]
    fn synthetic_frame_has_one_frame_boundary() {
        let frame = synthetic_frame(7, 1000);
        assert_eq!(frame.len(), 1000);
        assert_eq!(marker::find_start(&frame), Some(0));
        assert_eq!(marker::rfind_end(&frame), Some(998));
        assert!(!frame[3..998].contains(&0xFF));
    }

    #[test]
    fn would_block_drops_frame_other_errors_fail() {
        assert_eq!(drop_on_would_block(Ok(3)).unwrap(), Some(3));
        let full = io::Error::from(io::ErrorKind::WouldBlock);
        assert_eq!(drop_on_would_block(Err(full)).unwrap(), None);
        let refused = io::Error::from(io::ErrorKind::ConnectionRefused);
        assert_eq!(
            drop_on_would_block(Err(refused)).unwrap_err().kind(),
            io::ErrorKind::ConnectionRefused
        );
    }

    #[test]
    fn stream_frame_before_trigger_still_fails() {
        let mut sim = VehicleSim::bind(Endpoint::localhost(0), 9).unwrap();
        let err = sim.stream_frame(b"\xff\xd8\xff\xff\xd9").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
        assert_eq!(sim.frames_dropped(), 0);
    }

    #[test]
    fn send_before_trigger_is_not_connected() {
        let mut sim = VehicleSim::bind(Endpoint::localhost(0), 9).unwrap();
        let err = sim.send_frame(b"\xff\xd8\xff\xff\xd9").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
    }

    #[test]
    fn trigger_sets_peer_and_frames_are_chunked() {
        let mut station = PolledSocket::bind(Endpoint::localhost(0)).unwrap();
        let video_port = station.socket().local_addr().unwrap().port();
        let mut sim = VehicleSim::bind(Endpoint::localhost(0), video_port)
            .unwrap()
            .chunk_size(400);

        station
            .send_to(b"x", sim.local_addr().unwrap())
            .unwrap();
        station
            .send_to(&[KEEPALIVE_BYTE], sim.local_addr().unwrap())
            .unwrap();
        let peer = sim
            .wait_for_trigger(Duration::from_secs(1))
            .unwrap()
            .expect("trigger");
        assert_eq!(peer, station.socket().local_addr().unwrap());

        let frame = synthetic_frame(0, 1000);
        assert_eq!(sim.send_frame(&frame).unwrap(), 3);

        let mut received = Vec::new();
        let mut buf = [0u8; 1024];
        while received.len() < frame.len() {
            let (len, _) = station
                .recv_timeout(&mut buf, Duration::from_secs(1))
                .unwrap()
                .expect("video datagram");
            assert!(len <= 400);
            received.extend_from_slice(&buf[..len]);
        }
        assert_eq!(received, frame);
        assert_eq!(sim.frames_sent(), 1);
    }

    #[test]
    fn command_receiver_parses_and_rejects() {
        let mut rx = CommandReceiver::bind(Endpoint::localhost(0)).unwrap();
        let to = rx.local_addr().unwrap();
        let tx = UdpSocket::bind(Endpoint::localhost(0)).unwrap();

        tx.send_to(b"[255;000;128]|", to).unwrap();
        let msg = rx.recv(Duration::from_secs(1)).unwrap().expect("command");
        assert_eq!(msg.encode(), "[255;000;128]|");

        tx.send_to(b"hello", to).unwrap();
        assert!(matches!(
            rx.recv(Duration::from_secs(1)),
            Err(CommandError::Malformed(_))
        ));

        assert!(rx.recv(Duration::from_millis(20)).unwrap().is_none());
    }
}
