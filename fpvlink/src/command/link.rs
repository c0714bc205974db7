//! Sending commands to the vehicle.

use std::io;
use std::net::IpAddr;
use std::time::Duration;

use minstant::Instant;

use crate::net::{Endpoint, UdpSocket};
use crate::trace::trace;

use super::{CommandError, CommandMessage, ControllerSample, ControllerSource};

/// UDP sender for command messages.
///
/// Fire-and-forget: nothing is acknowledged and a lost message is simply
/// superseded by the next one.
pub struct CommandLink {
    socket: UdpSocket,
    to: Endpoint,
    sent: u64,
}

impl CommandLink {
    /// Binds an ephemeral socket for sending to `vehicle`'s command port.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be bound.
    pub fn bind(vehicle: IpAddr, command_port: u16) -> io::Result<Self> {
        let local = match vehicle {
            IpAddr::V4(_) => Endpoint::any(0),
            IpAddr::V6(_) => Endpoint::new(IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED), 0),
        };
        Ok(Self {
            socket: UdpSocket::bind(local)?,
            to: Endpoint::new(vehicle, command_port),
            sent: 0,
        })
    }

    /// Destination of every message.
    #[must_use]
    pub const fn target(&self) -> Endpoint {
        self.to
    }

    /// Messages sent so far.
    #[must_use]
    pub const fn sent(&self) -> u64 {
        self.sent
    }

    /// Sends one message.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Send`] if the datagram cannot be sent.
    pub fn send(&mut self, msg: &CommandMessage) -> Result<(), CommandError> {
        let wire = msg.encode();
        self.socket
            .send_to(wire.as_bytes(), self.to)
            .map_err(CommandError::Send)?;
        self.sent += 1;
        trace!(to = %self.to, msg = %wire, "command sent");
        Ok(())
    }

    /// Samples `controller` and sends the resulting message.
    ///
    /// # Errors
    ///
    /// Returns an error if the controller lacks a required axis or the send
    /// fails.
    pub fn send_from<S: ControllerSource + ?Sized>(
        &mut self,
        controller: &mut S,
    ) -> Result<CommandMessage, CommandError> {
        let sample = ControllerSample::capture(controller);
        let msg = CommandMessage::from_sample(&sample)?;
        self.send(&msg)?;
        Ok(msg)
    }
}

/// Decides when the next command is due.
///
/// Fires once more than one period has passed since the last firing; the
/// first firing comes one period after construction.
#[derive(Debug)]
pub struct CommandPacer {
    period: Duration,
    last: Instant,
}

impl CommandPacer {
    #[must_use]
    pub fn new(period: Duration) -> Self {
        Self::starting_at(Instant::now(), period)
    }

    #[must_use]
    pub const fn starting_at(now: Instant, period: Duration) -> Self {
        Self { period, last: now }
    }

    /// Returns true (and restarts the period) if a command is due at `now`.
    pub fn poll(&mut self, now: Instant) -> bool {
        let due = now
            .checked_duration_since(self.last)
            .is_some_and(|elapsed| elapsed > self.period);
        if due {
            self.last = now;
        }
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::NeutralController;
    use crate::net::PolledSocket;
    use std::net::Ipv4Addr;

    #[test]
    fn pacer_waits_one_period() {
        let t0 = Instant::now();
        let mut pacer = CommandPacer::starting_at(t0, Duration::from_millis(100));
        assert!(!pacer.poll(t0));
        assert!(!pacer.poll(t0 + Duration::from_millis(100)));
        assert!(pacer.poll(t0 + Duration::from_millis(101)));
        assert!(!pacer.poll(t0 + Duration::from_millis(150)));
        assert!(pacer.poll(t0 + Duration::from_millis(202)));
    }

    #[test]
    fn sends_encoded_message_to_command_port() {
        let mut vehicle = PolledSocket::bind(Endpoint::localhost(0)).unwrap();
        let port = vehicle.socket().local_addr().unwrap().port();
        let mut link = CommandLink::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), port).unwrap();

        let msg = link.send_from(&mut NeutralController::gamepad()).unwrap();
        assert_eq!(msg.encode(), "[000;000;128]|");
        assert_eq!(link.sent(), 1);

        let mut buf = [0u8; 32];
        let (len, _) = vehicle
            .recv_timeout(&mut buf, Duration::from_secs(1))
            .unwrap()
            .expect("command datagram");
        assert_eq!(&buf[..len], b"[000;000;128]|");
    }

    #[test]
    fn missing_axis_sends_nothing() {
        let mut link = CommandLink::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 9).unwrap();
        let err = link
            .send_from(&mut NeutralController::new(2, 0, 0))
            .unwrap_err();
        assert!(matches!(err, CommandError::MissingAxis { .. }));
        assert_eq!(link.sent(), 0);
    }
}
