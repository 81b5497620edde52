//! Simulated transport with scripted replies and fault injection.
//!
//! Shared state sits behind an `Arc<Mutex<_>>` so the test controls the
//! board from outside the driver task: queue replies, inject failures,
//! and inspect everything the driver wrote.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

use latchlink_driver::Transport;

/// Errors injected by the simulation.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SimError {
    /// Injected open failure.
    #[error("injected open failure")]
    Open,
    /// Injected write failure.
    #[error("injected write failure")]
    Write,
}

/// `None` marks an injected link-level failure.
type SimIo = Option<Vec<u8>>;

#[derive(Default)]
struct SimState {
    /// One entry consumed per write; each entry is the chunks the board
    /// sends back (empty = silence).
    script: VecDeque<Vec<Vec<u8>>>,
    /// Every frame the driver wrote, including ones whose write was
    /// failed by injection.
    written: Vec<Vec<u8>>,
    fail_next_writes: usize,
    fail_next_opens: usize,
    opens: usize,
    open: bool,
}

/// Simulated serial link to a scripted board.
pub struct SimTransport {
    shared: Arc<Mutex<SimState>>,
    incoming: mpsc::UnboundedReceiver<SimIo>,
    tx: mpsc::UnboundedSender<SimIo>,
}

/// Test-side controller for a [`SimTransport`].
#[derive(Clone)]
pub struct SimHandle {
    shared: Arc<Mutex<SimState>>,
    tx: mpsc::UnboundedSender<SimIo>,
}

impl SimTransport {
    /// Create a transport and its controlling handle.
    #[must_use]
    pub fn new() -> (Self, SimHandle) {
        let shared = Arc::new(Mutex::new(SimState::default()));
        let (tx, incoming) = mpsc::unbounded_channel();
        let handle = SimHandle { shared: Arc::clone(&shared), tx: tx.clone() };
        (Self { shared, incoming, tx }, handle)
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Transport for SimTransport {
    type Error = SimError;

    async fn open(&mut self) -> Result<(), SimError> {
        let mut state = self.lock();
        state.opens += 1;
        state.open = false;
        if state.fail_next_opens > 0 {
            state.fail_next_opens -= 1;
            return Err(SimError::Open);
        }
        state.open = true;
        Ok(())
    }

    fn close(&mut self) {
        self.lock().open = false;
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<(), SimError> {
        let reply = {
            let mut state = self.lock();
            state.written.push(bytes.to_vec());
            if state.fail_next_writes > 0 {
                state.fail_next_writes -= 1;
                return Err(SimError::Write);
            }
            state.script.pop_front()
        };

        match reply {
            Some(chunks) => {
                for chunk in chunks {
                    // Unbounded send only fails once the receiver side is
                    // gone, i.e. the transport itself was dropped.
                    let _ = self.tx.send(Some(chunk));
                }
            }
            None => debug!("board has no scripted reply; staying silent"),
        }
        Ok(())
    }

    async fn recv(&mut self) -> Option<Vec<u8>> {
        match self.incoming.recv().await {
            Some(Some(chunk)) => Some(chunk),
            Some(None) => None,
            // Controller dropped; nothing will ever arrive.
            None => std::future::pending().await,
        }
    }
}

impl SimHandle {
    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a reply delivered as a single chunk for the next unanswered
    /// write.
    pub fn reply_with(&self, frame: Vec<u8>) {
        self.lock().script.push_back(vec![frame]);
    }

    /// Queue a reply split across several chunks.
    pub fn reply_chunked(&self, chunks: Vec<Vec<u8>>) {
        self.lock().script.push_back(chunks);
    }

    /// Queue silence: the next write gets no reply at all.
    pub fn reply_silence(&self) {
        self.lock().script.push_back(Vec::new());
    }

    /// Fail the next `count` writes.
    pub fn fail_next_writes(&self, count: usize) {
        self.lock().fail_next_writes = count;
    }

    /// Fail the next `count` open attempts.
    pub fn fail_next_opens(&self, count: usize) {
        self.lock().fail_next_opens = count;
    }

    /// Deliver bytes the driver never asked for.
    pub fn inject_chunk(&self, chunk: Vec<u8>) {
        let _ = self.tx.send(Some(chunk));
    }

    /// Report a link-level failure to the driver.
    pub fn break_link(&self) {
        let _ = self.tx.send(None);
    }

    /// Every frame written so far, in order.
    #[must_use]
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.lock().written.clone()
    }

    /// Number of open attempts, successful or not.
    #[must_use]
    pub fn opens(&self) -> usize {
        self.lock().opens
    }

    /// Whether the link is currently open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.lock().open
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_consumes_one_scripted_reply() {
        let (mut transport, sim) = SimTransport::new();
        sim.reply_with(vec![0x01, 0x02]);

        transport.open().await.unwrap();
        transport.write(&[0xAA]).await.unwrap();

        assert_eq!(transport.recv().await, Some(vec![0x01, 0x02]));
        assert_eq!(sim.written(), vec![vec![0xAA]]);
    }

    #[tokio::test]
    async fn injected_failures_are_counted_down() {
        let (mut transport, sim) = SimTransport::new();
        sim.fail_next_opens(1);
        sim.fail_next_writes(1);

        assert_eq!(transport.open().await, Err(SimError::Open));
        transport.open().await.unwrap();
        assert_eq!(transport.write(&[0x01]).await, Err(SimError::Write));
        transport.write(&[0x02]).await.unwrap();

        assert_eq!(sim.opens(), 2);
        assert_eq!(sim.written().len(), 2);
    }

    #[tokio::test]
    async fn broken_link_surfaces_as_recv_none() {
        let (mut transport, sim) = SimTransport::new();
        transport.open().await.unwrap();
        sim.break_link();
        assert_eq!(transport.recv().await, None);
    }
}
