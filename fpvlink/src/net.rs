//! Network transport primitives.
//!
//! Provides the UDP socket abstractions used by the video listener, the
//! command link and the vehicle simulator.

pub mod endpoint;
pub mod poller;
pub mod socket;

pub use endpoint::Endpoint;
pub use poller::PolledSocket;
pub use socket::UdpSocket;
