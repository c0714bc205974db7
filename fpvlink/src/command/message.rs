//! Command wire format.
//!
//! ```text
//! [RRR;LLL;HHH]|
//!  │   │   └── axis 0 (steering)
//!  │   └────── axis 4 (left trigger)
//!  └────────── axis 5 (right trigger)
//! ```
//!
//! Each field is a zero-padded three digit decimal in `000..=255`. The field
//! order is fixed by the vehicle firmware.

use std::fmt;

use super::{CommandError, ControllerSample};

/// Encoded message length in bytes.
pub const MESSAGE_LEN: usize = 14;

/// Axis carried in the first field.
pub const RIGHT_AXIS: usize = 5;
/// Axis carried in the second field.
pub const LEFT_AXIS: usize = 4;
/// Axis carried in the third field.
pub const HEADING_AXIS: usize = 0;

/// One command for the vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandMessage {
    pub right: u8,
    pub left: u8,
    pub heading: u8,
}

impl CommandMessage {
    /// Picks the message fields out of a controller sample.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::MissingAxis`] if the controller lacks one of
    /// the axes the message carries.
    pub fn from_sample(sample: &ControllerSample) -> Result<Self, CommandError> {
        let axis = |index| {
            sample.axis(index).ok_or(CommandError::MissingAxis {
                index,
                available: sample.axis_count(),
            })
        };
        Ok(Self {
            right: axis(RIGHT_AXIS)?,
            left: axis(LEFT_AXIS)?,
            heading: axis(HEADING_AXIS)?,
        })
    }

    /// Renders the wire form.
    #[must_use]
    pub fn encode(&self) -> String {
        self.to_string()
    }

    /// Parses a received message.
    ///
    /// The delimiters must sit at their fixed offsets. The trailing `|` and
    /// anything after it are not checked.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Malformed`] if the layout or a field is wrong.
    pub fn parse(bytes: &[u8]) -> Result<Self, CommandError> {
        if bytes.len() < MESSAGE_LEN - 1 {
            return Err(CommandError::Malformed("too short"));
        }
        if bytes[0] != b'[' || bytes[4] != b';' || bytes[8] != b';' || bytes[12] != b']' {
            return Err(CommandError::Malformed("delimiters out of place"));
        }
        Ok(Self {
            right: parse_field(&bytes[1..4])?,
            left: parse_field(&bytes[5..8])?,
            heading: parse_field(&bytes[9..12])?,
        })
    }
}

fn parse_field(digits: &[u8]) -> Result<u8, CommandError> {
    if !digits.iter().all(u8::is_ascii_digit) {
        return Err(CommandError::Malformed("field is not decimal"));
    }
    let value = digits
        .iter()
        .fold(0u16, |acc, d| acc * 10 + u16::from(d - b'0'));
    u8::try_from(value).map_err(|_| CommandError::Malformed("field out of range"))
}

impl fmt::Display for CommandMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:03};{:03};{:03}]|", self.right, self.left, self.heading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::NeutralController;

    #[test]
    fn encode_pads_every_field() {
        let msg = CommandMessage {
            right: 0,
            left: 7,
            heading: 255,
        };
        assert_eq!(msg.encode(), "[000;007;255]|");
        assert_eq!(msg.encode().len(), MESSAGE_LEN);
    }

    #[test]
    fn fields_come_from_axes_5_4_0() {
        let mut pad = NeutralController::new(6, 0, 0)
            .with_axis(5, 1.0)
            .with_axis(4, -1.0)
            .with_axis(0, 0.0);
        let sample = ControllerSample::capture(&mut pad);
        let msg = CommandMessage::from_sample(&sample).unwrap();
        assert_eq!(msg.encode(), "[255;000;128]|");
    }

    #[test]
    fn too_few_axes() {
        let sample = ControllerSample::capture(&mut NeutralController::new(4, 2, 1));
        let err = CommandMessage::from_sample(&sample).unwrap_err();
        assert!(matches!(
            err,
            CommandError::MissingAxis {
                index: 5,
                available: 4
            }
        ));
    }

    #[test]
    fn parse_accepts_encoded() {
        let msg = CommandMessage::parse(b"[012;200;099]|").unwrap();
        assert_eq!(
            msg,
            CommandMessage {
                right: 12,
                left: 200,
                heading: 99
            }
        );
    }

    #[test]
    fn parse_tolerates_missing_terminator() {
        assert!(CommandMessage::parse(b"[001;002;003]").is_ok());
    }

    #[test]
    fn parse_rejects_malformed() {
        for bad in [
            &b"[01;002;003]|"[..],
            b"(001;002;003)|",
            b"[001;0x2;003]|",
            b"[001;256;003]|",
            b"[001;002",
            b"",
        ] {
            assert!(
                matches!(CommandMessage::parse(bad), Err(CommandError::Malformed(_))),
                "accepted {:?}",
                String::from_utf8_lossy(bad)
            );
        }
    }
}
