//! Timed receive on top of the non-blocking socket.

use std::io;
use std::time::Duration;

use minstant::Instant;
use mio::{Events, Interest, Poll, Token};

use super::{Endpoint, UdpSocket};

const SOCKET: Token = Token(0);

/// A UDP socket registered with its own [`Poll`], giving blocking reads with
/// a deadline.
///
/// mio readiness is edge-triggered: [`PolledSocket::recv_timeout`] always
/// tries a read before waiting, so a datagram that arrived while nobody was
/// polling is never stranded.
pub struct PolledSocket {
    socket: UdpSocket,
    poll: Poll,
    events: Events,
}

impl PolledSocket {
    /// Registers `socket` for read readiness.
    ///
    /// # Errors
    ///
    /// Returns an error if the poll instance cannot be created or the socket
    /// cannot be registered.
    pub fn new(mut socket: UdpSocket) -> io::Result<Self> {
        let poll = Poll::new()?;
        poll.registry()
            .register(&mut socket, SOCKET, Interest::READABLE)?;
        Ok(Self {
            socket,
            poll,
            events: Events::with_capacity(4),
        })
    }

    /// Binds a socket and registers it.
    ///
    /// # Errors
    ///
    /// Returns an error if binding or registration fails.
    pub fn bind(endpoint: Endpoint) -> io::Result<Self> {
        Self::new(UdpSocket::bind(endpoint)?)
    }

    /// Returns the wrapped socket.
    #[must_use]
    pub const fn socket(&self) -> &UdpSocket {
        &self.socket
    }

    /// Sends a datagram from this socket.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure.
    pub fn send_to(&self, buf: &[u8], dest: Endpoint) -> io::Result<usize> {
        self.socket.send_to(buf, dest)
    }

    /// Receives one datagram, waiting at most `timeout`.
    ///
    /// Returns `Ok(None)` when nothing arrived before the deadline.
    ///
    /// # Errors
    ///
    /// Returns any socket or poll error other than `WouldBlock`/`Interrupted`.
    pub fn recv_timeout(
        &mut self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> io::Result<Option<(usize, Endpoint)>> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(got) = self.socket.try_recv_from(buf)? {
                return Ok(Some(got));
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            match self.poll.poll(&mut self.events, Some(deadline - now)) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
    }
}
