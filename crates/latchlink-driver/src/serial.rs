//! Serial port transport.
//!
//! The board speaks 9600 baud, 8 data bits, no parity, one stop bit, no
//! flow control; none of it is negotiated. Reads happen on a dedicated
//! thread (the `serialport` crate is blocking) and are bridged to the
//! async driver loop over a channel; writes are small fixed frames and
//! run inline with a synchronous flush check.

use std::{
    io::{Read, Write},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

use crate::transport::Transport;

const BAUD_RATE: u32 = 9_600;

/// Poll granularity of the blocking reader thread; also bounds how long
/// the thread lingers after `close`.
const READ_TIMEOUT: Duration = Duration::from_millis(100);

const CHANNEL_CAPACITY: usize = 32;

/// Serial transport errors.
#[derive(Debug, Error)]
pub enum SerialError {
    /// Opening the device failed.
    #[error("failed to open {path}: {source}")]
    Open {
        /// Device path that failed to open.
        path: String,
        /// Underlying serial error.
        #[source]
        source: serialport::Error,
    },

    /// Write or flush failed.
    #[error("serial write failed: {0}")]
    Write(#[from] std::io::Error),

    /// Write attempted while the port is closed.
    #[error("port is not open")]
    NotOpen,
}

/// Exclusive handle to one serial device.
pub struct SerialTransport {
    path: String,
    chunk_size: usize,
    port: Option<Box<dyn SerialPort>>,
    incoming: Option<mpsc::Receiver<Vec<u8>>>,
    stop: Arc<AtomicBool>,
}

impl SerialTransport {
    /// Create a transport for the given device path. The port is not
    /// opened until the driver asks for it.
    #[must_use]
    pub fn new(path: &str, chunk_size: usize) -> Self {
        Self {
            path: path.to_string(),
            chunk_size,
            port: None,
            incoming: None,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl Transport for SerialTransport {
    type Error = SerialError;

    async fn open(&mut self) -> Result<(), SerialError> {
        self.close();

        let port = serialport::new(self.path.clone(), BAUD_RATE)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|source| SerialError::Open { path: self.path.clone(), source })?;

        let reader = port
            .try_clone()
            .map_err(|source| SerialError::Open { path: self.path.clone(), source })?;

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let chunk_size = self.chunk_size;
        std::thread::spawn(move || reader_loop(reader, chunk_size, &tx, &thread_stop));

        self.port = Some(port);
        self.incoming = Some(rx);
        self.stop = stop;
        Ok(())
    }

    fn close(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        self.port = None;
        self.incoming = None;
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<(), SerialError> {
        let Some(port) = self.port.as_mut() else {
            return Err(SerialError::NotOpen);
        };
        port.write_all(bytes)?;
        port.flush()?;
        Ok(())
    }

    async fn recv(&mut self) -> Option<Vec<u8>> {
        match self.incoming.as_mut() {
            Some(rx) => rx.recv().await,
            // Closed on purpose; park instead of reporting an error the
            // driver did not cause.
            None => std::future::pending().await,
        }
    }
}

/// Blocking read loop, one thread per open port.
///
/// Exits when the stop flag is set, the channel is dropped, or the port
/// reports a non-timeout error; dropping the sender is what surfaces the
/// failure to the async side.
fn reader_loop(
    mut port: Box<dyn SerialPort>,
    chunk_size: usize,
    tx: &mpsc::Sender<Vec<u8>>,
    stop: &AtomicBool,
) {
    let mut buf = vec![0u8; chunk_size];
    while !stop.load(Ordering::Relaxed) {
        match port.read(buf.as_mut_slice()) {
            // EOF: the device went away.
            Ok(0) => break,
            Ok(count) => {
                if tx.blocking_send(buf[..count].to_vec()).is_err() {
                    break;
                }
            }
            Err(error) if error.kind() == std::io::ErrorKind::TimedOut => {}
            Err(error) if error.kind() == std::io::ErrorKind::Interrupted => {}
            Err(error) => {
                debug!(%error, "serial read failed; stopping reader");
                break;
            }
        }
    }
}
