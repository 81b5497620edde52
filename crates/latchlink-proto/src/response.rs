//! Response frame verification and parsing.
//!
//! Responses extend the command layout with a board status byte and the
//! lock status:
//!
//! ```text
//! offset  0..4   magic
//! offset  4      length (total frame bytes; 0x0B for the fixed layout)
//! offset  5      board id
//! offset  6      command echo
//! offset  7      status (0x00 = OK)
//! offset  8      channel id
//! offset  9      lock status (0x00 = unlocked, 0x01 = locked)
//! last           XOR checksum over every preceding byte
//! ```
//!
//! Responses longer than the fixed layout are accepted: the fields above
//! stay at their offsets and the checksum stays at the end; anything in
//! between is ignored.

use crate::{
    command::Command,
    errors::{ProtocolError, Result},
    frame::{MAGIC, xor_checksum},
};

/// Length of the fixed response layout in bytes.
pub const RESPONSE_FRAME_LEN: usize = 11;

const BOARD_OFFSET: usize = 5;
const COMMAND_OFFSET: usize = 6;
const STATUS_OFFSET: usize = 7;
const CHANNEL_OFFSET: usize = 8;
const LOCK_STATUS_OFFSET: usize = 9;

/// Board-reported lock state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockStatus {
    /// The relay is released.
    Unlocked,
    /// The physical lock is engaged.
    Locked,
}

impl LockStatus {
    /// Parse a lock-status byte. `None` for anything but 0x00/0x01.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::Unlocked),
            0x01 => Some(Self::Locked),
            _ => None,
        }
    }

    /// Wire encoding of this lock status.
    #[must_use]
    pub const fn to_byte(self) -> u8 {
        match self {
            Self::Unlocked => 0x00,
            Self::Locked => 0x01,
        }
    }
}

/// A verified response frame.
///
/// Produced by [`ResponseFrame::parse`], which only succeeds once the
/// magic marker and trailing checksum have been checked. Field bytes are
/// kept raw; [`ResponseFrame::command_echo`] and
/// [`ResponseFrame::lock_status`] interpret them, returning `None` for
/// values outside the protocol. Whether an unrecognized value is an error
/// is the link layer's decision, not the codec's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseFrame {
    /// Board address echoed by the responder.
    pub board: u8,
    /// Raw command echo byte.
    pub command: u8,
    /// Board-reported status; 0x00 means the command was accepted.
    pub status: u8,
    /// Channel address echoed by the responder.
    pub channel: u8,
    /// Raw lock-status byte.
    pub lock_status: u8,
}

impl ResponseFrame {
    /// Verify `bytes` and extract the response fields.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::HeaderMismatch`] if the sequence does not begin
    ///   with [`MAGIC`]
    /// - [`ProtocolError::TooShort`] if shorter than the fixed layout
    /// - [`ProtocolError::ChecksumMismatch`] if the trailing byte is not
    ///   the XOR of all preceding bytes
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if !bytes.starts_with(&MAGIC) {
            return Err(ProtocolError::HeaderMismatch);
        }

        if bytes.len() < RESPONSE_FRAME_LEN {
            return Err(ProtocolError::TooShort {
                expected: RESPONSE_FRAME_LEN,
                actual: bytes.len(),
            });
        }

        let received = bytes[bytes.len() - 1];
        let computed = xor_checksum(&bytes[..bytes.len() - 1]);
        if computed != received {
            return Err(ProtocolError::ChecksumMismatch { computed, received });
        }

        Ok(Self {
            board: bytes[BOARD_OFFSET],
            command: bytes[COMMAND_OFFSET],
            status: bytes[STATUS_OFFSET],
            channel: bytes[CHANNEL_OFFSET],
            lock_status: bytes[LOCK_STATUS_OFFSET],
        })
    }

    /// Encode a response in the fixed 11-byte layout.
    ///
    /// The board side of the conversation; used by the simulation harness
    /// and by tests to fabricate well-formed responses.
    #[must_use]
    pub fn encode(&self) -> [u8; RESPONSE_FRAME_LEN] {
        let mut frame = [0u8; RESPONSE_FRAME_LEN];
        frame[..4].copy_from_slice(&MAGIC);
        frame[4] = RESPONSE_FRAME_LEN as u8;
        frame[BOARD_OFFSET] = self.board;
        frame[COMMAND_OFFSET] = self.command;
        frame[STATUS_OFFSET] = self.status;
        frame[CHANNEL_OFFSET] = self.channel;
        frame[LOCK_STATUS_OFFSET] = self.lock_status;
        frame[RESPONSE_FRAME_LEN - 1] = xor_checksum(&frame[..RESPONSE_FRAME_LEN - 1]);
        frame
    }

    /// Command echo as an enum. `None` if the echo byte is unrecognized.
    #[must_use]
    pub const fn command_echo(&self) -> Option<Command> {
        Command::from_byte(self.command)
    }

    /// Lock status as an enum. `None` if the byte is neither 0x00 nor 0x01.
    #[must_use]
    pub const fn lock_status(&self) -> Option<LockStatus> {
        LockStatus::from_byte(self.lock_status)
    }
}
