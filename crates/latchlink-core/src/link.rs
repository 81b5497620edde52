//! Lock-control state machine and retry/reconnect supervisor.
//!
//! Manages one unlock cycle against one board/channel pair: issue the
//! unlock, confirm it took effect, poll until the lock re-engages, then
//! close the link. Methods take time as input and return actions for the
//! driver to execute, keeping the machine pure (no I/O) and every
//! transition testable with plain values.
//!
//! Failure handling is split in two, which bounds transport-layer churn
//! separately from protocol-layer churn:
//!
//! - **Soft retry**: verification or mismatch failure while the link is
//!   open. Resend the command for the current state on the existing
//!   connection. No state change, no backoff.
//! - **Hard reconnect**: write failure, transport error, or response
//!   timeout. Remember the command to replay, close and reopen the port,
//!   backing off between failed open attempts indefinitely.

use std::{
    ops::Sub,
    time::{Duration, Instant},
};

use latchlink_proto::{Command, CommandFrame, LockStatus, ResponseFrame};
use tracing::{debug, warn};

use crate::{
    config::LinkConfig,
    error::LinkError,
    event::{LinkAction, LinkEvent},
};

/// Default board address.
pub const DEFAULT_BOARD: u8 = 0x01;

/// Default channel address.
pub const DEFAULT_CHANNEL: u8 = 0x01;

/// Lifecycle state of the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// No cycle in progress; the port is closed.
    Idle,
    /// Unlock sent (or queued behind a reconnect), awaiting its echo.
    Unlocking,
    /// Unlock acknowledged but the lock still reads engaged; re-checking.
    WaitingToUnlock,
    /// Lock released; polling until it re-engages.
    Polling,
}

/// What to replay once a reconnect succeeds.
///
/// Computed from the state at failure time, so the supervisor never has
/// to guess which frame a bare retry flag would have referred to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryIntent {
    /// Nothing to replay.
    None,
    /// Resend this command after the port reopens.
    Resend(Command),
}

/// Lock-control state machine.
///
/// Generic over the instant type so drivers can run it on real or virtual
/// time; only subtraction into a [`Duration`] is required.
#[derive(Debug, Clone)]
pub struct Link<I = Instant>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    state: LinkState,
    config: LinkConfig,
    board: u8,
    channel: u8,
    retry: RetryIntent,
    /// A close/open sequence is in progress (or backing off).
    reconnect_pending: bool,
    /// Instant the outstanding command was written, if any.
    awaiting_since: Option<I>,
}

impl<I> Link<I>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    /// Create an idle link with default addressing (board 0x01,
    /// channel 0x01).
    #[must_use]
    pub fn new(config: LinkConfig) -> Self {
        Self {
            state: LinkState::Idle,
            config,
            board: DEFAULT_BOARD,
            channel: DEFAULT_CHANNEL,
            retry: RetryIntent::None,
            reconnect_pending: false,
            awaiting_since: None,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Configured board address.
    #[must_use]
    pub fn board(&self) -> u8 {
        self.board
    }

    /// Configured channel address.
    #[must_use]
    pub fn channel(&self) -> u8 {
        self.channel
    }

    /// Pending replay intent.
    #[must_use]
    pub fn retry_intent(&self) -> RetryIntent {
        self.retry
    }

    /// Link configuration.
    #[must_use]
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Set the board address; takes effect on the next composed frame.
    pub fn set_board(&mut self, board: u8) {
        debug!(board, "board address set");
        self.board = board;
    }

    /// Set the channel address; takes effect on the next composed frame.
    pub fn set_channel(&mut self, channel: u8) {
        debug!(channel, "channel address set");
        self.channel = channel;
    }

    /// Begin an unlock cycle.
    ///
    /// Queues the unlock frame behind a (re)connect of the port.
    ///
    /// # Errors
    ///
    /// [`LinkError::InvalidState`] unless the link is [`LinkState::Idle`].
    pub fn unlock(&mut self) -> Result<Vec<LinkAction>, LinkError> {
        if self.state != LinkState::Idle {
            return Err(LinkError::InvalidState { state: self.state, operation: "unlock" });
        }

        debug!(board = self.board, channel = self.channel, "starting unlock cycle");
        self.state = LinkState::Unlocking;
        self.retry = RetryIntent::Resend(Command::Unlock);
        self.reconnect_pending = true;
        Ok(vec![LinkAction::OpenLink])
    }

    /// Force a status-polling cycle, sending a status frame immediately.
    ///
    /// Valid from any state; a write failure follows the same hard
    /// reconnect path as any other send.
    pub fn poll(&mut self, now: I) -> Vec<LinkAction> {
        debug!("forcing status poll");
        self.state = LinkState::Polling;
        self.send_command(Command::Status, now)
    }

    /// Process one driver event to completion.
    pub fn handle_event(&mut self, event: LinkEvent, now: I) -> Vec<LinkAction> {
        match event {
            LinkEvent::FrameReceived(bytes) => self.handle_response(&bytes, now),
            LinkEvent::WriteFailed => {
                warn!(state = ?self.state, "write failed");
                self.hard_reconnect()
            }
            LinkEvent::TransportError => {
                warn!(state = ?self.state, "transport error");
                self.hard_reconnect()
            }
            LinkEvent::Opened => self.handle_opened(now),
            LinkEvent::OpenFailed => {
                if !self.reconnect_pending {
                    debug!("open failure with no reconnect pending; ignoring");
                    return Vec::new();
                }
                warn!(backoff = ?self.config.reconnect_backoff, "port open failed; backing off");
                vec![LinkAction::ScheduleReconnect(self.config.reconnect_backoff)]
            }
            LinkEvent::ReconnectElapsed => {
                if !self.reconnect_pending {
                    debug!("stale reconnect timer; ignoring");
                    return Vec::new();
                }
                vec![LinkAction::OpenLink]
            }
            LinkEvent::PollElapsed => {
                if self.state != LinkState::Polling {
                    debug!(state = ?self.state, "stale poll timer; ignoring");
                    return Vec::new();
                }
                self.send_command(Command::Status, now)
            }
        }
    }

    /// Periodic housekeeping: detect an overdue response.
    ///
    /// A silent board would otherwise stall the cycle forever. An
    /// overdue response follows the hard reconnect path, which replays
    /// the current command.
    pub fn tick(&mut self, now: I) -> Vec<LinkAction> {
        if let Some(elapsed) = self.response_overdue(now) {
            warn!(?elapsed, state = ?self.state, "response overdue");
            return self.hard_reconnect();
        }
        Vec::new()
    }

    /// Elapsed time past the response timeout, if a command is
    /// outstanding and overdue. `None` otherwise.
    #[must_use]
    pub fn response_overdue(&self, now: I) -> Option<Duration> {
        let since = self.awaiting_since?;
        let elapsed = now - since;
        (elapsed > self.config.response_timeout).then_some(elapsed)
    }

    fn handle_opened(&mut self, now: I) -> Vec<LinkAction> {
        self.reconnect_pending = false;
        match self.retry {
            RetryIntent::Resend(command) => {
                debug!(?command, "port open; replaying command");
                self.retry = RetryIntent::None;
                self.send_command(command, now)
            }
            RetryIntent::None => Vec::new(),
        }
    }

    fn handle_response(&mut self, bytes: &[u8], now: I) -> Vec<LinkAction> {
        if self.state == LinkState::Idle {
            // Nothing in flight; stale bytes after the cycle completed.
            debug!("response while idle; dropping");
            return Vec::new();
        }

        let lock = match self.classify(bytes) {
            Ok(lock) => lock,
            Err(error) => {
                warn!(%error, state = ?self.state, "response rejected");
                return self.soft_retry(now);
            }
        };

        self.awaiting_since = None;
        debug!(?lock, state = ?self.state, "verified response");

        match (self.state, lock) {
            (LinkState::Unlocking | LinkState::WaitingToUnlock, LockStatus::Unlocked) => {
                self.state = LinkState::Polling;
                self.send_command(Command::Status, now)
            }
            (LinkState::Unlocking, LockStatus::Locked) => {
                self.state = LinkState::WaitingToUnlock;
                self.send_command(Command::Status, now)
            }
            (LinkState::WaitingToUnlock, LockStatus::Locked) => {
                self.send_command(Command::Status, now)
            }
            (LinkState::Polling, LockStatus::Unlocked) => {
                vec![LinkAction::SchedulePoll(self.config.poll_interval)]
            }
            (LinkState::Polling, LockStatus::Locked) => {
                debug!("lock engaged; cycle complete");
                self.state = LinkState::Idle;
                self.retry = RetryIntent::None;
                self.reconnect_pending = false;
                vec![LinkAction::NotifyLocked, LinkAction::CloseLink]
            }
            (LinkState::Idle, _) => Vec::new(),
        }
    }

    /// Validate a delimited frame against the link's identity and state.
    fn classify(&self, bytes: &[u8]) -> Result<LockStatus, LinkError> {
        let response = ResponseFrame::parse(bytes)?;

        if response.board != self.board || response.channel != self.channel {
            return Err(LinkError::AddressMismatch {
                board: response.board,
                channel: response.channel,
                expected_board: self.board,
                expected_channel: self.channel,
            });
        }

        let Some(expected) = self.command_for_state() else {
            return Err(LinkError::InvalidState { state: self.state, operation: "classify" });
        };
        if response.command != expected.to_byte() {
            return Err(LinkError::CommandMismatch {
                echoed: response.command,
                expected: expected.to_byte(),
            });
        }

        if response.status != 0x00 {
            return Err(LinkError::StatusError(response.status));
        }

        response.lock_status().ok_or(LinkError::UnknownLockStatus(response.lock_status))
    }

    /// Resend the command for the current state on the open link.
    fn soft_retry(&mut self, now: I) -> Vec<LinkAction> {
        match self.command_for_state() {
            Some(command) => self.send_command(command, now),
            None => Vec::new(),
        }
    }

    /// Close and reopen the port, replaying the current command once the
    /// open succeeds. Never gives up: a failed open schedules another
    /// attempt via [`LinkEvent::OpenFailed`].
    fn hard_reconnect(&mut self) -> Vec<LinkAction> {
        let Some(command) = self.command_for_state() else {
            // Transport noise after the cycle completed; the port is
            // already logically closed.
            debug!("transport event while idle; ignoring");
            return Vec::new();
        };

        self.retry = RetryIntent::Resend(command);
        self.reconnect_pending = true;
        self.awaiting_since = None;
        vec![LinkAction::NotifyLinkError, LinkAction::CloseLink, LinkAction::OpenLink]
    }

    fn send_command(&mut self, command: Command, now: I) -> Vec<LinkAction> {
        self.awaiting_since = Some(now);
        vec![LinkAction::SendFrame(CommandFrame::new(command, self.board, self.channel))]
    }

    /// The command a response must echo in the current state, and the one
    /// a retry replays.
    fn command_for_state(&self) -> Option<Command> {
        match self.state {
            LinkState::Idle => None,
            LinkState::Unlocking => Some(Command::Unlock),
            LinkState::WaitingToUnlock | LinkState::Polling => Some(Command::Status),
        }
    }
}
