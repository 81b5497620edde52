//! Error types for frame verification.

use thiserror::Error;

/// Convenience alias for codec results.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Reasons a received byte sequence is not a valid response frame.
///
/// Every variant is handled locally by the link layer (soft retry of the
/// current command); none of these are fatal to the caller.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    /// Frame does not begin with the protocol magic marker.
    #[error("header mismatch: frame does not begin with the magic marker")]
    HeaderMismatch,

    /// Trailing byte does not equal the XOR of all preceding bytes.
    #[error("checksum mismatch: computed {computed:#04x}, frame carries {received:#04x}")]
    ChecksumMismatch {
        /// XOR over every byte before the trailing checksum.
        computed: u8,
        /// Checksum byte actually carried by the frame.
        received: u8,
    },

    /// Frame is shorter than the fixed response layout.
    #[error("response too short: expected at least {expected} bytes, got {actual}")]
    TooShort {
        /// Minimum length of a response frame.
        expected: usize,
        /// Length of the received byte sequence.
        actual: usize,
    },
}
