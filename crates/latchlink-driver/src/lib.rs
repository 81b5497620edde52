//! Production driver for the Latchlink state machine.
//!
//! Three pieces:
//!
//! - [`Transport`](transport::Transport): the I/O seam. The state machine
//!   in `latchlink-core` never sees it; the driver loop translates
//!   transport activity into [`LinkEvent`](latchlink_core::LinkEvent)s
//!   and executes the returned actions.
//! - [`SerialTransport`](serial::SerialTransport): the real serial port,
//!   fixed at 9600 baud 8N1 with no flow control.
//! - [`LinkDriver`](driver::LinkDriver): the tokio event loop owning the
//!   reconnect, poll, and housekeeping timers, plus [`LinkHandle`]
//!   command/notification channels for the caller.
//!
//! The `latchlink` binary in this crate wires a serial port to the loop
//! and runs one unlock cycle.

#![forbid(unsafe_code)]

pub mod driver;
pub mod serial;
pub mod transport;

pub use driver::{LinkCommand, LinkDriver, LinkHandle, LinkNotification};
pub use serial::{SerialError, SerialTransport};
pub use transport::Transport;
