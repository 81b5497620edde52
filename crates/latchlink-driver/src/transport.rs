//! Transport abstraction.
//!
//! Decouples the driver loop from the physical serial port so the same
//! orchestration runs against real hardware and against the simulated
//! board in the test harness.

use std::future::Future;

/// A byte-stream link to the lock board.
///
/// Implementations own reconnection mechanics at the OS level only
/// (closing file handles, reopening device paths); retry policy lives in
/// the state machine.
pub trait Transport: Send {
    /// Transport-specific error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Close the link if open, then (re)open it.
    fn open(&mut self) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Close the link. Idempotent.
    fn close(&mut self);

    /// Write a whole frame and flush it.
    ///
    /// # Errors
    ///
    /// Returns an error if the write or flush fails; the driver feeds
    /// this back into the state machine as a write failure.
    fn write(&mut self, bytes: &[u8]) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Wait for the next chunk of received bytes.
    ///
    /// `None` signals a link-level failure; the driver treats it as a
    /// transport error and begins a hard reconnect.
    fn recv(&mut self) -> impl Future<Output = Option<Vec<u8>>> + Send;
}
