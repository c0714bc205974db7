//! Synchronization primitives shared by the RX thread and the station loop.
//!
//! - [`handoff`]: bounded frame hand-off with timed push/pop and the
//!   newest-wins drain.
//! - [`cancel`]: cooperative shutdown flag.

pub mod cancel;
pub mod handoff;

pub use cancel::CancelToken;
pub use handoff::{DrainPolicy, Taken, Timeout};
