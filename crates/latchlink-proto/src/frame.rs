//! Command frame construction.
//!
//! Commands are 9 bytes on the wire:
//!
//! ```text
//! [magic: 4][length: 1][board: 1][command: 1][channel: 1][checksum: 1]
//! ```
//!
//! The length byte is the total frame length (0x09 for every command this
//! driver sends). The checksum is the XOR of every preceding byte.

use crate::command::Command;

/// 4-byte marker identifying a valid frame.
pub const MAGIC: [u8; 4] = [0x57, 0x4B, 0x4C, 0x59];

/// Total length of a command frame in bytes.
pub const COMMAND_FRAME_LEN: usize = 9;

/// Smallest length a frame can declare (a bare command frame).
pub const MIN_FRAME_LEN: usize = COMMAND_FRAME_LEN;

/// Largest length a frame can declare, sized to the per-read receive
/// buffer. Anything larger is treated as line noise.
pub const MAX_FRAME_LEN: usize = 32;

/// XOR of all bytes in `bytes`.
///
/// The protocol's checksum: a well-formed frame carries the XOR of its
/// prefix as its final byte.
#[must_use]
pub fn xor_checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0x00, |acc, byte| acc ^ byte)
}

/// An outgoing command addressed to one board/channel pair.
///
/// [`CommandFrame::encode`] is deterministic: the same command, board, and
/// channel always produce the same 9 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandFrame {
    /// Operation to perform.
    pub command: Command,
    /// Target board address.
    pub board: u8,
    /// Target channel address.
    pub channel: u8,
}

impl CommandFrame {
    /// Create a command frame for the given addressing pair.
    #[must_use]
    pub const fn new(command: Command, board: u8, channel: u8) -> Self {
        Self { command, board, channel }
    }

    /// Encode to wire bytes.
    #[must_use]
    pub fn encode(&self) -> [u8; COMMAND_FRAME_LEN] {
        let mut frame = [0u8; COMMAND_FRAME_LEN];
        frame[..4].copy_from_slice(&MAGIC);
        frame[4] = COMMAND_FRAME_LEN as u8;
        frame[5] = self.board;
        frame[6] = self.command.to_byte();
        frame[7] = self.channel;
        frame[8] = xor_checksum(&frame[..COMMAND_FRAME_LEN - 1]);
        frame
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn unlock_frame_bytes() {
        let frame = CommandFrame::new(Command::Unlock, 0x01, 0x01);
        assert_eq!(frame.encode(), hex!("57 4B 4C 59 09 01 82 01 82"));
    }

    #[test]
    fn status_frame_bytes() {
        let frame = CommandFrame::new(Command::Status, 0x01, 0x01);
        assert_eq!(frame.encode(), hex!("57 4B 4C 59 09 01 83 01 83"));
    }

    #[test]
    fn checksum_covers_all_prior_bytes() {
        let frame = CommandFrame::new(Command::Unlock, 0x7F, 0x03).encode();
        assert_eq!(frame[COMMAND_FRAME_LEN - 1], xor_checksum(&frame[..COMMAND_FRAME_LEN - 1]));
    }
}
