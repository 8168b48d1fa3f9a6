//! In-memory link between two endpoints on different threads.

use core::time::Duration;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};

use super::Transport;
use crate::error::{TransportError, TransportResult};

/// One end of an in-memory, real-time byte link.
///
/// Bytes written on one end are read from the other. Dropping either end
/// makes the peer's reads fail with [`TransportError::Closed`].
#[derive(Debug)]
pub struct ChannelTransport {
    tx: Sender<u8>,
    rx: Receiver<u8>,
}

impl ChannelTransport {
    /// Creates two connected ends.
    pub fn pair() -> (Self, Self) {
        let (a_tx, b_rx) = mpsc::channel();
        let (b_tx, a_rx) = mpsc::channel();
        (Self { tx: a_tx, rx: a_rx }, Self { tx: b_tx, rx: b_rx })
    }
}

impl Transport for ChannelTransport {
    fn read_byte(&mut self, timeout: Duration) -> TransportResult<Option<u8>> {
        match self.rx.recv_timeout(timeout) {
            Ok(byte) => Ok(Some(byte)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(TransportError::Closed),
        }
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> TransportResult<()> {
        for &byte in bytes {
            self.tx.send(byte).map_err(|_| TransportError::Closed)?;
        }
        Ok(())
    }
}
