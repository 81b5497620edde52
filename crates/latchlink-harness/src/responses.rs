//! Board-side frame builders.
//!
//! The harness plays the physical board, so it needs to fabricate the
//! responses a real board would send and, for fault injection, the ones
//! it should not.

use latchlink_proto::{Command, LockStatus, ResponseFrame};

/// A well-formed response frame with every field explicit.
#[must_use]
pub fn response(board: u8, channel: u8, command: Command, status: u8, lock_status: u8) -> Vec<u8> {
    ResponseFrame { board, command: command.to_byte(), status, channel, lock_status }
        .encode()
        .to_vec()
}

/// Successful reply to an unlock command.
#[must_use]
pub fn unlock_response(board: u8, channel: u8, lock: LockStatus) -> Vec<u8> {
    response(board, channel, Command::Unlock, 0x00, lock.to_byte())
}

/// Successful reply to a status command.
#[must_use]
pub fn status_response(board: u8, channel: u8, lock: LockStatus) -> Vec<u8> {
    response(board, channel, Command::Status, 0x00, lock.to_byte())
}

/// Flip the trailing byte so the checksum no longer holds.
#[must_use]
pub fn corrupted(mut frame: Vec<u8>) -> Vec<u8> {
    if let Some(last) = frame.last_mut() {
        *last ^= 0x01;
    }
    frame
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use latchlink_proto::ProtocolError;

    use super::*;

    #[test]
    fn builders_produce_parseable_frames() {
        let wire = status_response(0x01, 0x01, LockStatus::Locked);
        let parsed = ResponseFrame::parse(&wire).unwrap();
        assert_eq!(parsed.command_echo(), Some(Command::Status));
        assert_eq!(parsed.lock_status(), Some(LockStatus::Locked));
    }

    #[test]
    fn corrupted_frames_fail_verification() {
        let wire = corrupted(unlock_response(0x01, 0x01, LockStatus::Unlocked));
        assert!(matches!(
            ResponseFrame::parse(&wire),
            Err(ProtocolError::ChecksumMismatch { .. })
        ));
    }
}
