//! The driver event loop.
//!
//! Serializes every source of activity (caller commands, timer
//! expiries, transport reads) through one `select!` loop, so state
//! transitions happen strictly one event at a time. The loop executes
//! the actions the state machine returns and feeds any resulting events
//! (open results, write failures) straight back in until the queue is
//! drained.

use std::collections::VecDeque;

use latchlink_core::{FrameAssembler, Link, LinkAction, LinkConfig, LinkEvent};
use tokio::{
    sync::mpsc,
    time::{self, Duration, Instant, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use crate::transport::Transport;

/// Cadence of the response-timeout check.
const TICK_INTERVAL: Duration = Duration::from_millis(500);

const COMMAND_CAPACITY: usize = 16;
const NOTIFY_CAPACITY: usize = 16;

/// Requests a caller can make of the running driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkCommand {
    /// Set the board address for subsequent frames.
    SetBoard(u8),
    /// Set the channel address for subsequent frames.
    SetChannel(u8),
    /// Begin an unlock cycle (valid while idle).
    Unlock,
    /// Force a status-polling cycle.
    Poll,
    /// Stop the driver loop and close the port.
    Shutdown,
}

/// Events the driver reports back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkNotification {
    /// The lock re-engaged; the cycle is complete and the port closed.
    Locked,
    /// A hard reconnect was triggered. Informational: the driver keeps
    /// retrying on its own.
    LinkError,
}

/// Caller-side handle to a running [`LinkDriver`].
pub struct LinkHandle {
    commands: mpsc::Sender<LinkCommand>,
    notifications: mpsc::Receiver<LinkNotification>,
}

impl LinkHandle {
    /// Queue a command for the driver loop.
    ///
    /// Returns `false` if the driver has stopped.
    pub async fn command(&self, command: LinkCommand) -> bool {
        self.commands.send(command).await.is_ok()
    }

    /// Wait for the next notification. `None` once the driver stops.
    pub async fn notified(&mut self) -> Option<LinkNotification> {
        self.notifications.recv().await
    }
}

/// Owns the state machine, the transport, and every timer.
pub struct LinkDriver<T: Transport> {
    link: Link<Instant>,
    transport: T,
    assembler: FrameAssembler,
    commands: mpsc::Receiver<LinkCommand>,
    notifications: mpsc::Sender<LinkNotification>,
    reconnect_at: Option<Instant>,
    poll_at: Option<Instant>,
    port_open: bool,
}

impl<T: Transport> LinkDriver<T> {
    /// Create a driver and the handle that controls it.
    #[must_use]
    pub fn new(config: LinkConfig, transport: T) -> (Self, LinkHandle) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (notify_tx, notify_rx) = mpsc::channel(NOTIFY_CAPACITY);

        let driver = Self {
            link: Link::new(config),
            transport,
            assembler: FrameAssembler::new(),
            commands: command_rx,
            notifications: notify_tx,
            reconnect_at: None,
            poll_at: None,
            port_open: false,
        };
        let handle = LinkHandle { commands: command_tx, notifications: notify_rx };
        (driver, handle)
    }

    /// Run until [`LinkCommand::Shutdown`] or until every handle is
    /// dropped.
    pub async fn run(mut self) {
        let mut housekeeping = time::interval(TICK_INTERVAL);
        housekeeping.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let port_open = self.port_open;
            let actions = tokio::select! {
                biased;

                maybe_command = self.commands.recv() => {
                    let Some(command) = maybe_command else { break };
                    if command == LinkCommand::Shutdown {
                        break;
                    }
                    self.handle_command(command)
                }

                () = Self::sleep_until(self.reconnect_at) => {
                    self.reconnect_at = None;
                    self.link.handle_event(LinkEvent::ReconnectElapsed, Instant::now())
                }

                () = Self::sleep_until(self.poll_at) => {
                    self.poll_at = None;
                    self.link.handle_event(LinkEvent::PollElapsed, Instant::now())
                }

                chunk = self.transport.recv(), if port_open => match chunk {
                    Some(bytes) => self.handle_bytes(&bytes),
                    None => {
                        self.port_open = false;
                        self.link.handle_event(LinkEvent::TransportError, Instant::now())
                    }
                },

                _ = housekeeping.tick() => self.link.tick(Instant::now()),
            };

            self.execute(actions).await;
        }

        debug!("driver stopping");
        self.transport.close();
    }

    fn handle_command(&mut self, command: LinkCommand) -> Vec<LinkAction> {
        match command {
            LinkCommand::SetBoard(board) => {
                self.link.set_board(board);
                Vec::new()
            }
            LinkCommand::SetChannel(channel) => {
                self.link.set_channel(channel);
                Vec::new()
            }
            LinkCommand::Unlock => match self.link.unlock() {
                Ok(actions) => actions,
                Err(error) => {
                    warn!(%error, "unlock rejected");
                    Vec::new()
                }
            },
            LinkCommand::Poll => self.link.poll(Instant::now()),
            // Handled by the run loop before dispatch.
            LinkCommand::Shutdown => Vec::new(),
        }
    }

    fn handle_bytes(&mut self, bytes: &[u8]) -> Vec<LinkAction> {
        let now = Instant::now();
        let mut actions = Vec::new();
        for frame in self.assembler.push(bytes) {
            actions.extend(self.link.handle_event(LinkEvent::FrameReceived(frame), now));
        }
        actions
    }

    /// Execute actions in order, feeding follow-up events back into the
    /// state machine until nothing is left to do.
    async fn execute(&mut self, actions: Vec<LinkAction>) {
        let mut queue = VecDeque::from(actions);
        while let Some(action) = queue.pop_front() {
            match action {
                LinkAction::SendFrame(frame) => {
                    debug!(?frame, "sending frame");
                    if let Err(error) = self.transport.write(&frame.encode()).await {
                        warn!(%error, "write failed");
                        queue.extend(
                            self.link.handle_event(LinkEvent::WriteFailed, Instant::now()),
                        );
                    }
                }
                LinkAction::OpenLink => {
                    // Stale bytes from the previous session must not leak
                    // into the new one.
                    self.assembler.clear();
                    match self.transport.open().await {
                        Ok(()) => {
                            info!("port open");
                            self.port_open = true;
                            queue.extend(
                                self.link.handle_event(LinkEvent::Opened, Instant::now()),
                            );
                        }
                        Err(error) => {
                            warn!(%error, "failed to open port");
                            self.port_open = false;
                            queue.extend(
                                self.link.handle_event(LinkEvent::OpenFailed, Instant::now()),
                            );
                        }
                    }
                }
                LinkAction::CloseLink => {
                    self.transport.close();
                    self.port_open = false;
                    self.reconnect_at = None;
                    self.poll_at = None;
                }
                LinkAction::ScheduleReconnect(delay) => {
                    self.reconnect_at = Some(Instant::now() + delay);
                }
                LinkAction::SchedulePoll(delay) => {
                    self.poll_at = Some(Instant::now() + delay);
                }
                LinkAction::NotifyLocked => self.notify(LinkNotification::Locked),
                LinkAction::NotifyLinkError => self.notify(LinkNotification::LinkError),
            }
        }
    }

    fn notify(&self, notification: LinkNotification) {
        // Notifications are informational; a slow caller must not stall
        // the protocol loop.
        if self.notifications.try_send(notification).is_err() {
            debug!(?notification, "notification dropped");
        }
    }

    async fn sleep_until(deadline: Option<Instant>) {
        match deadline {
            Some(at) => time::sleep_until(at).await,
            None => std::future::pending().await,
        }
    }
}
