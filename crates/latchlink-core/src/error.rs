//! Error types for the link layer.
//!
//! Most of these never escape the state machine: verification and
//! mismatch failures are consumed by the retry supervisor and only leave
//! a trace in the log. The exception is
//! [`LinkError::InvalidState`], returned when a caller requests an
//! operation the current state does not permit.

use latchlink_proto::ProtocolError;
use thiserror::Error;

use crate::link::LinkState;

/// Reasons a response is rejected or an operation refused.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// Operation not valid in the current state.
    #[error("cannot {operation} while {state:?}")]
    InvalidState {
        /// State at the time of the call.
        state: LinkState,
        /// Operation that was attempted.
        operation: &'static str,
    },

    /// Frame-level verification failed.
    #[error("frame verification failed: {0}")]
    Verification(#[from] ProtocolError),

    /// Response addressed to a different board/channel pair.
    #[error(
        "address mismatch: response for board {board:#04x} channel {channel:#04x}, \
         configured {expected_board:#04x}/{expected_channel:#04x}"
    )]
    AddressMismatch {
        /// Board id carried by the response.
        board: u8,
        /// Channel id carried by the response.
        channel: u8,
        /// Board id this link is configured for.
        expected_board: u8,
        /// Channel id this link is configured for.
        expected_channel: u8,
    },

    /// Response echoed a command other than the one in flight.
    #[error("command mismatch: response echoed {echoed:#04x}, expected {expected:#04x}")]
    CommandMismatch {
        /// Command byte echoed by the board.
        echoed: u8,
        /// Command byte expected for the current state.
        expected: u8,
    },

    /// Board reported a non-zero status byte.
    #[error("board reported status {0:#04x}")]
    StatusError(u8),

    /// Lock-status byte was neither locked nor unlocked.
    #[error("unrecognized lock status {0:#04x}")]
    UnknownLockStatus(u8),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn verification_error_wraps_protocol_error() {
        let error: LinkError = ProtocolError::HeaderMismatch.into();
        assert_eq!(error, LinkError::Verification(ProtocolError::HeaderMismatch));
    }

    #[test]
    fn display_carries_hex_fields() {
        let error = LinkError::CommandMismatch { echoed: 0x83, expected: 0x82 };
        assert_eq!(error.to_string(), "command mismatch: response echoed 0x83, expected 0x82");
    }
}
