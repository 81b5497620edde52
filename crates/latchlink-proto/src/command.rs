//! Command bytes understood by the lock board.

/// Operation requested from the board.
///
/// The board echoes the command byte back in its response; the echo is
/// checked against the command expected for the link's current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Release the relay on the addressed channel.
    Unlock,
    /// Report the current lock status of the addressed channel.
    Status,
}

impl Command {
    /// Wire encoding of this command.
    #[must_use]
    pub const fn to_byte(self) -> u8 {
        match self {
            Self::Unlock => 0x82,
            Self::Status => 0x83,
        }
    }

    /// Parse a command byte. `None` if unrecognized.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x82 => Some(Self::Unlock),
            0x83 => Some(Self::Status),
            _ => None,
        }
    }
}
