//! Command path: controller state out to the vehicle.
//!
//! Every command period the station samples the controller, scales each
//! input onto `0..=255`, and sends the fixed-width `[RRR;LLL;HHH]|` message
//! to the vehicle's command port.

pub mod link;
pub mod message;
pub mod sample;

pub use link::{CommandLink, CommandPacer};
pub use message::CommandMessage;
pub use sample::{ControllerSample, ControllerSource, NeutralController, scale_axis, scale_button};

use std::io;

/// Error building, parsing or sending a command message.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// The controller has fewer axes than the message needs.
    #[error("controller has no axis {index} ({available} available)")]
    MissingAxis { index: usize, available: usize },
    /// Bytes received on the command port are not a command message.
    #[error("malformed command message: {0}")]
    Malformed(&'static str),
    #[error("failed to send command: {0}")]
    Send(#[source] io::Error),
    #[error("failed to receive command: {0}")]
    Recv(#[source] io::Error),
}
