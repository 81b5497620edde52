//! Deterministic test harness for the Latchlink driver.
//!
//! [`SimTransport`] implements the driver's `Transport` trait against a
//! scripted board instead of a serial device: each write consumes one
//! scripted reply (zero or more chunks), and open/write failures can be
//! injected by count. Combined with tokio's paused clock, the real
//! driver loop runs end to end with virtual timers and fully
//! deterministic I/O.
//!
//! The `responses` module builds board-side frames so tests and scripts
//! speak real wire bytes.

#![forbid(unsafe_code)]

pub mod responses;
pub mod sim_transport;

pub use responses::{corrupted, response, status_response, unlock_response};
pub use sim_transport::{SimError, SimHandle, SimTransport};
