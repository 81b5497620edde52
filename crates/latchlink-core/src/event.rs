//! Events fed into the state machine and actions it returns.

use std::time::Duration;

use latchlink_proto::CommandFrame;

/// Inputs to [`Link::handle_event`](crate::link::Link::handle_event).
///
/// The driver translates transport and timer activity into these events;
/// the state machine never observes I/O directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// A delimited frame arrived from the transport (not yet verified).
    FrameReceived(Vec<u8>),
    /// A write or flush on the transport failed.
    WriteFailed,
    /// The transport reported a link-level error or closed unexpectedly.
    TransportError,
    /// A requested open of the transport succeeded.
    Opened,
    /// A requested open of the transport failed.
    OpenFailed,
    /// The reconnect backoff timer elapsed.
    ReconnectElapsed,
    /// The poll interval timer elapsed.
    PollElapsed,
}

/// Instructions for the driver.
///
/// Returned by every state-machine method; the driver executes them in
/// order and feeds any resulting events back in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkAction {
    /// Encode and write this frame to the transport.
    SendFrame(CommandFrame),
    /// Open the transport, closing it first if currently open. The driver
    /// answers with [`LinkEvent::Opened`] or [`LinkEvent::OpenFailed`].
    OpenLink,
    /// Close the transport and cancel pending timers.
    CloseLink,
    /// Arm the reconnect timer; fires [`LinkEvent::ReconnectElapsed`].
    ScheduleReconnect(Duration),
    /// Arm the poll timer; fires [`LinkEvent::PollElapsed`].
    SchedulePoll(Duration),
    /// Tell the caller the lock is engaged; fired once per unlock cycle.
    NotifyLocked,
    /// Tell the caller a hard reconnect was triggered (informational; the
    /// supervisor keeps retrying on its own).
    NotifyLinkError,
}
