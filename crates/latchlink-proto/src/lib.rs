//! Wire format for the Latchlink lock-board protocol.
//!
//! The board speaks a small fixed-layout binary protocol over a serial
//! line. Every message starts with a 4-byte magic marker, carries its own
//! total length in the fifth byte, and ends with an XOR checksum over all
//! preceding bytes. Commands are 9 bytes; responses echo the command and
//! add a board status byte and the lock status.
//!
//! This crate is the pure codec: it builds command frames and
//! verifies/parses response frames. It holds no state and never touches a
//! transport.
//!
//! # Invariants
//!
//! - A frame is valid only if it begins with [`MAGIC`] and its trailing
//!   byte equals the XOR of every prior byte. Any single-byte corruption
//!   of a well-formed frame violates one of the two checks.
//! - Encoding is a pure function of its inputs; encode-then-parse
//!   round-trips all fields (verified by property tests).

#![forbid(unsafe_code)]

pub mod command;
pub mod errors;
pub mod frame;
pub mod response;

pub use command::Command;
pub use errors::{ProtocolError, Result};
pub use frame::{COMMAND_FRAME_LEN, CommandFrame, MAGIC, MAX_FRAME_LEN, MIN_FRAME_LEN, xor_checksum};
pub use response::{LockStatus, RESPONSE_FRAME_LEN, ResponseFrame};
