//! Link configuration.
//!
//! Every knob lives in one value passed at construction; there is no
//! process-wide mutable state.

use std::time::Duration;

/// Default serial device path.
pub const DEFAULT_PORT_PATH: &str = "/dev/ttyUSB0";

/// Delay between reconnect attempts after the port fails to open.
pub const DEFAULT_RECONNECT_BACKOFF: Duration = Duration::from_millis(10_000);

/// Interval between status polls while the lock is released.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10_000);

/// Time allowed for the board to answer an outstanding command before the
/// link is presumed dead.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_millis(5_000);

/// Bytes requested from the transport per read.
pub const DEFAULT_RECEIVE_CHUNK: usize = 32;

/// Link configuration.
///
/// `Default` yields the constants above.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    /// Serial device path.
    pub port_path: String,
    /// Backoff between reconnect attempts.
    pub reconnect_backoff: Duration,
    /// Steady-state poll interval.
    pub poll_interval: Duration,
    /// Per-command response timeout.
    pub response_timeout: Duration,
    /// Receive chunk size in bytes.
    pub receive_chunk: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            port_path: DEFAULT_PORT_PATH.to_string(),
            reconnect_backoff: DEFAULT_RECONNECT_BACKOFF,
            poll_interval: DEFAULT_POLL_INTERVAL,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            receive_chunk: DEFAULT_RECEIVE_CHUNK,
        }
    }
}
