//! Video RX loop.
//!
//! Responsibilities:
//! - Own the video socket and the [`Reassembler`].
//! - Wait up to the read timeout for each datagram; on silence (or a failed
//!   read) send the keepalive byte to the vehicle, every time.
//! - Offer each completed frame to the hand-off with a bounded wait and drop
//!   it if the station loop does not make room in time.
//! - Stop when the cancel token is set. The token is only checked between
//!   reads, so shutdown takes at most one read timeout.

use std::io;
use std::net::IpAddr;
use std::time::Duration;

use minstant::Instant;

use crate::config::{KEEPALIVE_BYTE, LinkConfig, MAX_DATAGRAM_SIZE};
use crate::net::{Endpoint, PolledSocket, UdpSocket};
use crate::sync::CancelToken;
use crate::sync::handoff::{Producer, Timeout};
use crate::trace::{debug, info, trace, warn};

use super::stats::{REPORT_INTERVAL, RateMeter};
use super::{Frame, Reassembler, StreamStats};

/// Result of one [`Listener::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// A datagram of this many bytes was reassembled.
    Datagram(usize),
    /// Nothing arrived in time; a keepalive was sent.
    Keepalive,
}

/// The background half of the link.
pub struct Listener {
    socket: PolledSocket,
    reassembler: Reassembler,
    frames: Producer<Frame>,
    keepalive_to: Endpoint,
    cancel: CancelToken,
    read_timeout: Duration,
    admit_timeout: Timeout,
    stats: StreamStats,
    meter: RateMeter,
    recv_buf: Vec<u8>,
}

impl Listener {
    /// Binds the video socket.
    ///
    /// `vehicle` is the vehicle's address; keepalives go to its keepalive
    /// port.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be bound or registered.
    pub fn bind(
        config: &LinkConfig,
        vehicle: IpAddr,
        frames: Producer<Frame>,
        cancel: CancelToken,
    ) -> io::Result<Self> {
        let socket = UdpSocket::bind(config.listen_endpoint())?;
        if let Err(_e) = socket.set_recv_buffer_size(config.recv_buffer_size) {
            warn!(error = %_e, "could not enlarge video receive buffer");
        }
        let socket = PolledSocket::new(socket)?;
        Ok(Self {
            socket,
            reassembler: Reassembler::new(),
            frames,
            keepalive_to: Endpoint::new(vehicle, config.keepalive_port),
            cancel,
            read_timeout: config.read_timeout(),
            admit_timeout: Timeout::from(config.admit_timeout()),
            stats: StreamStats::default(),
            meter: RateMeter::new(REPORT_INTERVAL),
            recv_buf: vec![0u8; MAX_DATAGRAM_SIZE],
        })
    }

    /// Address the video socket is bound to.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be read from the socket.
    pub fn local_addr(&self) -> io::Result<Endpoint> {
        self.socket.socket().local_addr()
    }

    #[must_use]
    pub const fn stats(&self) -> StreamStats {
        self.stats
    }

    /// Runs until cancelled and returns the session counters.
    pub fn run(mut self) -> StreamStats {
        info!(
            local = ?self.local_addr().ok(),
            keepalive_to = %self.keepalive_to,
            "start streaming"
        );
        while !self.cancel.is_cancelled() {
            self.step();
        }
        info!(
            frames = self.stats.frames,
            invalid = self.stats.invalid,
            dropped = self.stats.dropped,
            keepalives = self.stats.keepalives,
            "stop streaming"
        );
        self.stats
    }

    /// Waits for one datagram and processes it, or sends a keepalive.
    pub fn step(&mut self) -> Step {
        let received = self
            .socket
            .recv_timeout(&mut self.recv_buf, self.read_timeout);
        let step = self.handle(received);
        self.report();
        step
    }

    /// Acts on one receive attempt: reassemble what arrived, or send a
    /// keepalive if the read timed out or failed.
    fn handle(&mut self, received: io::Result<Option<(usize, Endpoint)>>) -> Step {
        match received {
            Ok(Some((len, _from))) => {
                trace!(len, from = %_from, "datagram");
                self.ingest(len);
                Step::Datagram(len)
            }
            Ok(None) => {
                self.send_keepalive();
                Step::Keepalive
            }
            Err(_e) => {
                debug!(error = %_e, "video read failed");
                self.send_keepalive();
                Step::Keepalive
            }
        }
    }

    fn ingest(&mut self, len: usize) {
        self.stats.datagrams += 1;
        self.stats.bytes += len as u64;

        let frames = &self.frames;
        let admit = self.admit_timeout;
        let stats = &mut self.stats;
        let meter = &mut self.meter;
        let outcome = self.reassembler.push(&self.recv_buf[..len], |frame| {
            let size = frame.len() as u64;
            match frames.push_blocking(frame, admit) {
                Ok(()) => {
                    stats.frames += 1;
                    meter.record(1, size);
                }
                Err(_frame) => {
                    warn!(len = _frame.len(), "frame queue full, dropping frame");
                    stats.dropped += 1;
                }
            }
        });
        self.stats.invalid += outcome.invalid as u64;
        if outcome.overflowed {
            self.stats.overflows += 1;
        }
    }

    fn send_keepalive(&mut self) {
        self.stats.keepalives += 1;
        match self.socket.send_to(&[KEEPALIVE_BYTE], self.keepalive_to) {
            Ok(_) => trace!(to = %self.keepalive_to, "keepalive"),
            Err(_e) => debug!(to = %self.keepalive_to, error = %_e, "keepalive send failed"),
        }
    }

    fn report(&mut self) {
        if let Some(_rate) = self.meter.tick(Instant::now()) {
            debug!(
                fps = _rate.fps,
                mbps = _rate.mbps,
                queued = self.frames.len(),
                "video rate"
            );
        }
    }
}
