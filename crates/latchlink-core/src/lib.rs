//! Link state machine and retry supervisor for the Latchlink lock board.
//!
//! Uses the action pattern: the [`Link`](link::Link) state machine is
//! pure - methods take events and the current time as input and return
//! [`LinkAction`](event::LinkAction)s for a driver to execute. This keeps
//! protocol logic free of I/O and makes every transition testable with
//! plain values.
//!
//! # State Machine
//!
//! ```text
//! ┌──────┐ unlock() ┌───────────┐ locked  ┌─────────────────┐
//! │ Idle │─────────>│ Unlocking │────────>│ WaitingToUnlock │
//! └──────┘          └───────────┘         └─────────────────┘
//!     ↑                   │ unlocked                │ unlocked
//!     │                   ↓                         │
//!     │  locked      ┌─────────┐<───────────────────┘
//!     └──────────────│ Polling │<─┐
//!                    └─────────┘  │ unlocked (poll again)
//!                         └───────┘
//! ```
//!
//! Transport failures and malformed responses never surface to the
//! caller: the supervisor resends on the open link (soft retry) or closes
//! and reopens the port with a fixed backoff (hard reconnect), retrying
//! indefinitely.

#![forbid(unsafe_code)]

pub mod assembler;
pub mod config;
pub mod error;
pub mod event;
pub mod link;

pub use assembler::FrameAssembler;
pub use config::LinkConfig;
pub use error::LinkError;
pub use event::{LinkAction, LinkEvent};
pub use link::{Link, LinkState, RetryIntent};
